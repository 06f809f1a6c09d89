//! Job submission: validates requests, reserves the job id in the progress
//! registry and drives the job to completion.

use std::sync::Arc;

use tracing::warn;
use url::Url;

use super::crawl::run_grammar_scan;
use super::error::ScanError;
use super::migrate::run_migration;
use super::progress::{JobLease, ProgressRegistry};
use super::types::{
    CrawlJob, GrammarScanRequest, MigrationExport, MigrationJob, ProgressEntry, ScanConfig,
    ScanOutcome,
};

/// Releases a job's progress entry if the job stops without completing, so an
/// abandoned or failed run never keeps its id blocked.
struct ReleaseOnDrop<'a> {
    registry: &'a ProgressRegistry,
    lease: &'a JobLease,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.registry.release(self.lease);
    }
}

/// Shared handle to the scan engine: configuration plus the progress
/// registry every job reports into.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<ScanConfig>,
    registry: Arc<ProgressRegistry>,
}

impl Engine {
    pub fn new(config: ScanConfig) -> Self {
        let registry = Arc::new(ProgressRegistry::new(config.progress_ttl));
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: ScanConfig, registry: Arc<ProgressRegistry>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProgressRegistry> {
        &self.registry
    }

    pub async fn grammar_scan(&self, request: GrammarScanRequest) -> Result<ScanOutcome, ScanError> {
        let job = grammar_job(request, &self.config)?;
        let lease = self.registry.start(&job.id, job.max_pages)?;
        let _guard = ReleaseOnDrop {
            registry: &self.registry,
            lease: &lease,
        };

        let result = run_grammar_scan(&job, &self.config, &self.registry, &lease).await;
        if let Err(err) = &result {
            warn!(job_id = %job.id, error = %err, "grammar scan aborted");
        }
        result
    }

    pub async fn migration(&self, job: MigrationJob) -> Result<MigrationExport, ScanError> {
        validate_migration_job(&job)?;
        let lease = self.registry.start(&job.id, job.initial_budget())?;
        let _guard = ReleaseOnDrop {
            registry: &self.registry,
            lease: &lease,
        };

        let result = run_migration(&job, &self.config, &self.registry, &lease).await;
        if let Err(err) = &result {
            warn!(job_id = %job.id, error = %err, "migration aborted");
        }
        result
    }

    pub fn progress(&self, job_id: &str) -> ProgressEntry {
        self.registry.get(job_id)
    }

    pub fn clear(&self, job_id: &str) -> bool {
        self.registry.clear(job_id)
    }
}

/// Validates a grammar scan request and fills in defaults.
pub fn grammar_job(request: GrammarScanRequest, config: &ScanConfig) -> Result<CrawlJob, ScanError> {
    let base_url = request.base_domain.trim().to_string();
    if base_url.is_empty() {
        return Err(ScanError::MissingField("baseDomain"));
    }
    check_http_url(&base_url)?;

    Ok(CrawlJob {
        id: request
            .job_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_job_id),
        base_url,
        max_pages: request.max_pages,
        find_word: request.find_word.filter(|w| !w.is_empty()),
        precursor_rule: request.precursor_rule,
        ignore_words: request
            .ignore_words
            .into_iter()
            .filter(|w| !w.trim().is_empty())
            .collect(),
        delay: request.delay.unwrap_or(config.default_delay),
        find_broken_links: request.find_broken_links,
    })
}

fn validate_migration_job(job: &MigrationJob) -> Result<(), ScanError> {
    if job.id.trim().is_empty() {
        return Err(ScanError::MissingField("scanId"));
    }
    check_http_url(&job.base_url)
}

fn check_http_url(raw: &str) -> Result<(), ScanError> {
    let url = Url::parse(raw).map_err(|err| ScanError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        _ => Err(ScanError::InvalidUrl {
            url: raw.to_string(),
            reason: "expected an http(s) URL with a host".to_string(),
        }),
    }
}

pub fn new_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
