//! Blog migration jobs: find or enumerate blog posts, parse each one into a
//! `PageRecord`, and export the records as CSV.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use super::data_io::{page_record_from_metadata, write_page_records};
use super::error::ScanError;
use super::extract::{ExtractMode, extract, page_links};
use super::fetch::Fetcher;
use super::frontier::{Frontier, Scope, normalize_crawl_url};
use super::progress::{JobLease, ProgressRegistry};
use super::types::{MigrationExport, MigrationJob, MigrationTarget, PageRecord, ScanConfig};

const BLOG_PATH_MARKER: &str = "/blog/";
/// Discovery visits at most this many pages per requested blog post.
const DISCOVERY_FANOUT: usize = 10;

/// Runs either migration mode under the job's reserved progress `lease`.
pub async fn run_migration(
    job: &MigrationJob,
    config: &ScanConfig,
    registry: &ProgressRegistry,
    lease: &JobLease,
) -> Result<MigrationExport, ScanError> {
    match &job.target {
        MigrationTarget::AllBlogs { max_pages } => {
            get_all_blogs(job, *max_pages, config, registry, lease).await
        }
        MigrationTarget::SpecificBlogs { slugs } => {
            get_specific_blogs(job, slugs, config, registry, lease).await
        }
    }
}

pub async fn get_all_blogs(
    job: &MigrationJob,
    max_pages: usize,
    config: &ScanConfig,
    registry: &ProgressRegistry,
    lease: &JobLease,
) -> Result<MigrationExport, ScanError> {
    let fetcher = Fetcher::connect(&job.base_url, config).await?;
    info!(
        job_id = %job.id,
        index = %job.base_url,
        max_pages,
        strategy = fetcher.strategy().label(),
        "blog discovery started"
    );

    let blog_urls = extract_blog_links(&fetcher, &job.base_url, max_pages, lease).await?;
    let records = parse_all(&fetcher, &blog_urls, registry, lease).await?;
    let export = finish(job, records, false, |n| {
        format!("Crawled {n} blog posts from {}", job.base_url)
    })?;
    registry.complete(lease);
    Ok(export)
}

pub async fn get_specific_blogs(
    job: &MigrationJob,
    slugs: &[String],
    config: &ScanConfig,
    registry: &ProgressRegistry,
    lease: &JobLease,
) -> Result<MigrationExport, ScanError> {
    let fetcher = Fetcher::connect(&job.base_url, config).await?;
    info!(
        job_id = %job.id,
        base = %job.base_url,
        slugs = slugs.len(),
        strategy = fetcher.strategy().label(),
        "blog list export started"
    );

    let urls = slugs
        .iter()
        .map(|slug| slug_url(&job.base_url, slug))
        .collect::<Vec<_>>();
    let records = parse_all(&fetcher, &urls, registry, lease).await?;
    let export = finish(job, records, true, |n| {
        format!("Processed {n} selected blog posts from {}", job.base_url)
    })?;
    registry.complete(lease);
    Ok(export)
}

/// Breadth-first walk from `index_url` collecting every link that contains
/// `/blog/`, in discovery order. Only pages under `index_url` are expanded.
/// Collected URLs keep the form they were linked with; the normalized form is
/// only used to avoid visiting a page twice.
pub async fn extract_blog_links(
    fetcher: &Fetcher,
    index_url: &str,
    max_pages: usize,
    lease: &JobLease,
) -> Result<Vec<String>, ScanError> {
    let prefix = normalize_crawl_url(index_url).ok_or_else(|| ScanError::InvalidUrl {
        url: index_url.to_string(),
        reason: "not an http(s) URL".to_string(),
    })?;
    let budget = max_pages.saturating_mul(DISCOVERY_FANOUT).max(1);
    let mut frontier = Frontier::new(index_url, budget, Scope::Prefix(prefix.clone()))?;

    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut linked_as = HashMap::from([(prefix, index_url.trim().to_string())]);
    while found.len() < max_pages {
        let Some(url) = frontier.next() else {
            break;
        };
        if lease.is_cancelled() {
            return Err(ScanError::Cancelled(lease.job_id().to_string()));
        }
        if !frontier.mark_visited(&url) {
            continue;
        }

        let page_url = linked_as.remove(&url).unwrap_or(url);
        let body = match fetcher.fetch(&page_url).await {
            Ok(body) => body,
            Err(err) => {
                warn!(url = %page_url, error = %err, "blog index page skipped");
                continue;
            }
        };
        for link in page_links(&body, &page_url) {
            if link.contains(BLOG_PATH_MARKER) && seen.insert(link.clone()) {
                found.push(link.clone());
            }
            if frontier.offer(&link) {
                if let Some(key) = normalize_crawl_url(&link) {
                    linked_as.insert(key, link);
                }
            }
        }
    }

    found.truncate(max_pages);
    debug!(
        index = index_url,
        visited = frontier.visited_count(),
        found = found.len(),
        "blog discovery finished"
    );
    Ok(found)
}

/// Fetches one blog post. Failures produce an unexportable placeholder record.
pub async fn parse_blog_page(fetcher: &Fetcher, url: &str) -> PageRecord {
    let body = match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(err) => {
            warn!(url, error = %err, "blog post unavailable");
            return PageRecord::unavailable(url);
        }
    };
    match extract(&body, url, ExtractMode::Blog).metadata {
        Some(meta) => page_record_from_metadata(url, &meta),
        None => PageRecord::unavailable(url),
    }
}

async fn parse_all(
    fetcher: &Fetcher,
    urls: &[String],
    registry: &ProgressRegistry,
    lease: &JobLease,
) -> Result<Vec<PageRecord>, ScanError> {
    let total = urls.len();
    registry.set_budget(lease, total);

    let mut records = Vec::with_capacity(total);
    for (idx, url) in urls.iter().enumerate() {
        if lease.is_cancelled() {
            return Err(ScanError::Cancelled(lease.job_id().to_string()));
        }
        let record = parse_blog_page(fetcher, url).await;
        debug!(url = %url, parsed = record.is_exportable(), "blog post processed");
        records.push(record);
        registry.update(lease, idx + 1, total);
    }
    Ok(records)
}

fn finish(
    job: &MigrationJob,
    records: Vec<PageRecord>,
    include_imagefile: bool,
    summary: impl FnOnce(usize) -> String,
) -> Result<MigrationExport, ScanError> {
    let exported = records.iter().filter(|r| r.is_exportable()).count();
    let csv = write_page_records(&records, include_imagefile)?;
    let summary = summary(exported);
    info!(job_id = %job.id, records = exported, "{summary}");
    Ok(MigrationExport {
        job_id: job.id.clone(),
        summary,
        csv,
        records: exported,
    })
}

/// `base + slug`, with the slug forced to end in `/`.
fn slug_url(base: &str, slug: &str) -> String {
    if slug.ends_with('/') {
        format!("{base}{slug}")
    } else {
        format!("{base}{slug}/")
    }
}
