//! The grammar scan job loop.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::detect::{DetectorSet, Linter, PageInput};
use super::error::ScanError;
use super::extract::{ExtractMode, Extraction, cap_chars, extract};
use super::fetch::Fetcher;
use super::frontier::{Frontier, Scope};
use super::progress::{JobLease, ProgressRegistry};
use super::types::{CrawlJob, Issue, ScanConfig, ScanOutcome};

/// Crawls `job.base_url` breadth-first, one page at a time, and runs the
/// job's checks on every page. `lease` is the job's reserved progress entry;
/// it is marked done when the crawl finishes.
pub async fn run_grammar_scan(
    job: &CrawlJob,
    config: &ScanConfig,
    registry: &ProgressRegistry,
    lease: &JobLease,
) -> Result<ScanOutcome, ScanError> {
    let started = Instant::now();
    let fetcher = Fetcher::connect(&job.base_url, config).await?;
    let linter = Linter::new(fetcher.client().clone(), config);
    let detectors = DetectorSet::for_job(job);
    let mut frontier = Frontier::new(&job.base_url, job.max_pages, Scope::same_origin_as(&job.base_url)?)?;

    info!(
        job_id = %job.id,
        base = %job.base_url,
        max_pages = job.max_pages,
        strategy = fetcher.strategy().label(),
        checks = ?detectors.detectors().iter().map(|d| d.name()).collect::<Vec<_>>(),
        "grammar scan started"
    );

    let mut issues = Vec::new();
    while let Some(url) = frontier.next() {
        if lease.is_cancelled() {
            return Err(ScanError::Cancelled(job.id.clone()));
        }
        if !frontier.mark_visited(&url) {
            continue;
        }
        let visited = frontier.visited_count();
        registry.update(lease, visited, visited + frontier.pending_count());

        let links = scan_page(&url, &fetcher, &linter, &detectors, config, &mut issues).await;
        for link in &links {
            frontier.offer(link);
        }

        if !frontier.is_exhausted() {
            pause(job.delay, lease).await?;
        }
    }

    registry.complete(lease);
    let outcome = ScanOutcome {
        domain: job.base_url.trim_end_matches('/').to_string(),
        pages_analyzed: frontier.visited_count(),
        duration: started.elapsed(),
        issues,
    };
    info!(
        job_id = %job.id,
        pages = outcome.pages_analyzed,
        issues = outcome.issues.len(),
        elapsed_ms = outcome.duration.as_millis() as u64,
        "grammar scan finished"
    );
    Ok(outcome)
}

/// Fetches and checks one page, returning the links it points to. An
/// unavailable or unparsable page yields no issues and no links.
async fn scan_page(
    url: &str,
    fetcher: &Fetcher,
    linter: &Linter,
    detectors: &DetectorSet,
    config: &ScanConfig,
    issues: &mut Vec<Issue>,
) -> Vec<String> {
    let body = match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(err) => {
            debug!(url, error = %err, "page skipped");
            return Vec::new();
        }
    };

    let extraction = panic::catch_unwind(AssertUnwindSafe(|| extract(&body, url, ExtractMode::Text)));
    let Ok(Extraction { text, links, .. }) = extraction else {
        warn!(url, "page extraction failed");
        return Vec::new();
    };

    let page = PageInput {
        url,
        text: cap_chars(&text, config.max_text_chars),
        links: &links,
    };
    let found = detectors.run(page, fetcher, linter).await;
    debug!(url, links = links.len(), issues = found.len(), "page checked");
    issues.extend(found);
    links
}

async fn pause(delay: Duration, lease: &JobLease) -> Result<(), ScanError> {
    if delay.is_zero() {
        return Ok(());
    }
    tokio::select! {
        _ = lease.cancel_token().cancelled() => Err(ScanError::Cancelled(lease.job_id().to_string())),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
