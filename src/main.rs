use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proofcrawl::app::data_io::default_output_path;
use proofcrawl::app::report::render_report;
use proofcrawl::app::runtime::{Engine, new_job_id};
use proofcrawl::app::server::{self, AppState};
use proofcrawl::app::types::{
    DEFAULT_LINTER_ENDPOINT, DEFAULT_PREVIEW_PASSWORD, GrammarScanRequest, MigrationJob,
    MigrationTarget, PrecursorRule, ScanConfig,
};

#[derive(Debug, Parser)]
#[command(
    name = "proofcrawl",
    version,
    about = "Crawl a site for grammar, spelling and broken links, or export its blog for migration"
)]
struct Cli {
    /// Grammar/spelling check endpoint (LanguageTool `/v2/check` API).
    #[arg(long, env = "LANGUAGETOOL_URL", global = true, default_value = DEFAULT_LINTER_ENDPOINT)]
    linter_url: String,

    #[arg(
        long,
        env = "PREVIEW_PASSWORD",
        global = true,
        hide_env_values = true,
        default_value = DEFAULT_PREVIEW_PASSWORD
    )]
    preview_password: String,

    #[arg(long, value_name = "SECS", global = true, default_value_t = 20)]
    timeout_secs: u64,

    #[arg(long, value_name = "UA", global = true)]
    user_agent: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Crawl a site and print the grammar report.
    Grammar(GrammarArgs),
    /// Export blog posts as migration CSV.
    Blogs(BlogsArgs),
    /// Run the HTTP API.
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
struct GrammarArgs {
    #[arg(value_name = "URL")]
    url: String,

    #[arg(long, value_name = "N", default_value_t = 10)]
    max_pages: usize,

    #[arg(long, value_name = "TERM")]
    find_word: Option<String>,

    #[arg(long, value_name = "TEXT", requires = "phrase")]
    precursor: Option<String>,

    #[arg(long, value_name = "TEXT", requires = "precursor")]
    phrase: Option<String>,

    #[arg(long = "ignore", value_name = "WORD", value_delimiter = ',')]
    ignore_words: Vec<String>,

    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    #[arg(long, default_value_t = false)]
    broken_links: bool,

    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct BlogsArgs {
    /// Blog index URL, or the base URL the slugs are appended to.
    #[arg(value_name = "URL")]
    url: String,

    #[arg(long = "slug", value_name = "SLUG")]
    slugs: Vec<String>,

    #[arg(long, value_name = "N", default_value_t = 100)]
    max_pages: usize,

    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Require `Authorization: Bearer <token>` on every request.
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        let mut config = ScanConfig {
            linter_endpoint: self.linter_url.clone(),
            preview_password: self.preview_password.clone(),
            request_timeout: Duration::from_secs(self.timeout_secs.max(1)),
            ..ScanConfig::default()
        };
        if let Some(ua) = &self.user_agent {
            config.user_agent = ua.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,proofcrawl=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let engine = Engine::new(cli.scan_config());

    match cli.command {
        Command::Grammar(args) => run_grammar(&engine, args).await,
        Command::Blogs(args) => run_blogs(&engine, args).await,
        Command::Serve(args) => {
            let addr = SocketAddr::new(args.host, args.port);
            let state = AppState {
                engine,
                api_token: args.api_token.filter(|t| !t.is_empty()).map(Arc::from),
            };
            server::serve(addr, state).await
        }
    }
}

async fn run_grammar(engine: &Engine, args: GrammarArgs) -> Result<()> {
    let request = GrammarScanRequest {
        job_id: Some(new_job_id()),
        base_domain: args.url,
        max_pages: args.max_pages,
        find_word: args.find_word,
        precursor_rule: match (&args.precursor, &args.phrase) {
            (Some(precursor), Some(phrase)) => PrecursorRule::new(precursor, phrase),
            _ => None,
        },
        ignore_words: args.ignore_words,
        delay: args.delay_ms.map(Duration::from_millis),
        find_broken_links: args.broken_links,
    };

    let outcome = tokio::select! {
        result = engine.grammar_scan(request) => result.context("grammar scan failed")?,
        _ = tokio::signal::ctrl_c() => bail!("interrupted"),
    };
    let report = render_report(&outcome);

    match args.output {
        Some(path) => {
            std::fs::write(&path, report)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(output = %path.display(), "report written");
        }
        None => print!("{report}"),
    }
    Ok(())
}

async fn run_blogs(engine: &Engine, args: BlogsArgs) -> Result<()> {
    let target = if args.slugs.is_empty() {
        MigrationTarget::AllBlogs {
            max_pages: args.max_pages,
        }
    } else {
        MigrationTarget::SpecificBlogs { slugs: args.slugs }
    };
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(default_output_path(&args.url)));
    let job = MigrationJob {
        id: new_job_id(),
        base_url: args.url,
        target,
    };

    let export = tokio::select! {
        result = engine.migration(job) => result.context("blog export failed")?,
        _ = tokio::signal::ctrl_c() => bail!("interrupted"),
    };
    std::fs::write(&output, &export.csv)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(output = %output.display(), records = export.records, "{}", export.summary);
    Ok(())
}
