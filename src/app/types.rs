use std::time::Duration;

use serde::Serialize;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";
pub const DEFAULT_LINTER_ENDPOINT: &str = "https://api.languagetoolplus.com/v2/check";
pub const DEFAULT_PREVIEW_MARKER: &str = "preview.octanesites";
pub const DEFAULT_PREVIEW_PASSWORD: &str = "takealook";

/// Engine-wide settings shared by every job the process runs.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
    pub linter_endpoint: String,
    pub linter_language: String,
    /// Base URLs containing this marker are fetched through the preview login.
    pub preview_marker: String,
    pub preview_password: String,
    pub preview_max_redirects: usize,
    pub max_text_chars: usize,
    pub lint_chunk_chars: usize,
    pub default_delay: Duration,
    pub progress_ttl: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(20),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            linter_endpoint: DEFAULT_LINTER_ENDPOINT.to_string(),
            linter_language: "en-US".to_string(),
            preview_marker: DEFAULT_PREVIEW_MARKER.to_string(),
            preview_password: DEFAULT_PREVIEW_PASSWORD.to_string(),
            preview_max_redirects: 5,
            max_text_chars: 40_000,
            lint_chunk_chars: 4_000,
            default_delay: Duration::from_millis(500),
            progress_ttl: Duration::from_secs(3600),
        }
    }
}

/// What a caller asks for when submitting a grammar scan.
#[derive(Debug, Clone, Default)]
pub struct GrammarScanRequest {
    pub job_id: Option<String>,
    pub base_domain: String,
    pub max_pages: usize,
    pub find_word: Option<String>,
    pub precursor_rule: Option<PrecursorRule>,
    pub ignore_words: Vec<String>,
    pub delay: Option<Duration>,
    pub find_broken_links: bool,
}

/// A phrase that must always be preceded by `precursor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecursorRule {
    pub precursor: String,
    pub phrase: String,
}

impl PrecursorRule {
    /// Both halves are required; an empty one disables the rule.
    pub fn new(precursor: &str, phrase: &str) -> Option<Self> {
        if precursor.is_empty() || phrase.is_empty() {
            return None;
        }
        Some(Self {
            precursor: precursor.to_string(),
            phrase: phrase.to_string(),
        })
    }
}

/// A validated grammar scan, owned by the task that drives it.
#[derive(Debug, Clone)]
pub struct CrawlJob {
    pub id: String,
    pub base_url: String,
    pub max_pages: usize,
    pub find_word: Option<String>,
    pub precursor_rule: Option<PrecursorRule>,
    pub ignore_words: Vec<String>,
    pub delay: Duration,
    pub find_broken_links: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    Grammar,
    Spelling,
    Broken,
}

impl IssueKind {
    pub fn label(self) -> &'static str {
        match self {
            IssueKind::Grammar => "grammar",
            IssueKind::Spelling => "spelling",
            IssueKind::Broken => "broken",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub url: String,
    pub message: String,
    pub suggestions: String,
    pub context: String,
}

impl Issue {
    pub fn new(
        kind: IssueKind,
        url: &str,
        message: impl Into<String>,
        suggestions: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            url: url.to_string(),
            message: message.into(),
            suggestions: suggestions.into(),
            context: context.into(),
        }
    }
}

/// Everything the text report needs once a grammar scan has finished.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub domain: String,
    pub pages_analyzed: usize,
    pub duration: Duration,
    pub issues: Vec<Issue>,
}

/// Metadata pulled from a blog post for the migration export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlogMetadata {
    pub title: String,
    pub title_tag: String,
    pub description: String,
    pub publish_date: String,
    pub content_html: String,
    pub first_image: String,
    pub noindex: bool,
}

/// One row of the migration CSV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub pageid: String,
    pub pageparent: u32,
    pub pagetitle: String,
    pub pagelive: String,
    pub pageintrash: u32,
    pub titletag: String,
    pub metadesc: String,
    pub publishdate: String,
    pub oldurl: String,
    pub pagedata: String,
    pub post_type: String,
    pub published: String,
    pub fix_images: String,
    pub blogcategories: String,
    pub tags: String,
    pub overrideurl: String,
    pub noindex: String,
    pub imagefile: String,
}

impl PageRecord {
    /// Placeholder for a page that could not be fetched; dropped from exports.
    pub fn unavailable(url: &str) -> Self {
        Self {
            pageid: String::new(),
            pageparent: 0,
            pagetitle: String::new(),
            pagelive: "live".to_string(),
            pageintrash: 0,
            titletag: String::new(),
            metadesc: String::new(),
            publishdate: String::new(),
            oldurl: url.to_string(),
            pagedata: String::new(),
            post_type: "post".to_string(),
            published: "no".to_string(),
            fix_images: "FALSE".to_string(),
            blogcategories: String::new(),
            tags: String::new(),
            overrideurl: String::new(),
            noindex: "unknown".to_string(),
            imagefile: String::new(),
        }
    }

    pub fn is_exportable(&self) -> bool {
        !self.pagetitle.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationTarget {
    /// Discover every `/blog/` URL reachable from the index page.
    AllBlogs { max_pages: usize },
    /// Slugs appended to the base URL.
    SpecificBlogs { slugs: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct MigrationJob {
    pub id: String,
    pub base_url: String,
    pub target: MigrationTarget,
}

impl MigrationJob {
    /// Progress budget before the real page list is known.
    pub fn initial_budget(&self) -> usize {
        match &self.target {
            MigrationTarget::AllBlogs { max_pages } => *max_pages,
            MigrationTarget::SpecificBlogs { slugs } => slugs.len(),
        }
    }
}

/// Result of a migration job: the CSV text plus a one-line summary.
#[derive(Debug, Clone)]
pub struct MigrationExport {
    pub job_id: String,
    pub summary: String,
    pub csv: String,
    pub records: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Done,
    NotFound,
}

/// What a progress poll sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visited: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    pub percent: u8,
}

impl ProgressEntry {
    pub fn not_found() -> Self {
        Self {
            status: JobStatus::NotFound,
            visited: None,
            total: None,
            percent: 0,
        }
    }
}
