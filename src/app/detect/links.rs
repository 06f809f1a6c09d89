use tracing::debug;

use crate::app::fetch::Fetcher;
use crate::app::types::{Issue, IssueKind};

/// HEADs every outbound link of a page, one `broken` issue per failure.
pub async fn probe_links(fetcher: &Fetcher, page_url: &str, links: &[String]) -> Vec<Issue> {
    let mut issues = Vec::new();
    for link in links {
        if let Err(err) = fetcher.probe(link).await {
            debug!(page = page_url, link = %link, error = %err, "broken link");
            issues.push(Issue::new(
                IssueKind::Broken,
                page_url,
                "Broken link",
                "N/A",
                link.as_str(),
            ));
        }
    }
    issues
}
