//! Per-page content checks.
//!
//! The checks a job runs are fixed when the job starts and always run in the
//! same order: custom term, precursor rule, external linter, broken links.

mod links;
mod linter;
mod terms;

pub use links::probe_links;
pub use linter::Linter;
pub use terms::{custom_term_issue, precursor_issues};

use super::fetch::Fetcher;
use super::types::{CrawlJob, Issue, PrecursorRule};

#[derive(Debug, Clone)]
pub enum Detector {
    CustomTerm(String),
    Precursor(PrecursorRule),
    Linter { ignore_words: Vec<String> },
    BrokenLinks,
}

impl Detector {
    pub fn name(&self) -> &'static str {
        match self {
            Detector::CustomTerm(_) => "custom_term",
            Detector::Precursor(_) => "precursor",
            Detector::Linter { .. } => "linter",
            Detector::BrokenLinks => "broken_links",
        }
    }
}

/// The text and links of one fetched page.
#[derive(Debug, Clone, Copy)]
pub struct PageInput<'a> {
    pub url: &'a str,
    pub text: &'a str,
    pub links: &'a [String],
}

#[derive(Debug, Clone)]
pub struct DetectorSet {
    detectors: Vec<Detector>,
}

impl DetectorSet {
    /// The linter only runs when no custom term is configured.
    pub fn for_job(job: &CrawlJob) -> Self {
        let mut detectors = Vec::new();
        if let Some(term) = job.find_word.as_ref().filter(|t| !t.is_empty()) {
            detectors.push(Detector::CustomTerm(term.clone()));
        }
        if let Some(rule) = &job.precursor_rule {
            detectors.push(Detector::Precursor(rule.clone()));
        }
        if detectors
            .iter()
            .all(|d| !matches!(d, Detector::CustomTerm(_)))
        {
            detectors.push(Detector::Linter {
                ignore_words: job.ignore_words.clone(),
            });
        }
        if job.find_broken_links {
            detectors.push(Detector::BrokenLinks);
        }
        Self { detectors }
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub async fn run(&self, page: PageInput<'_>, fetcher: &Fetcher, linter: &Linter) -> Vec<Issue> {
        let mut issues = Vec::new();
        for detector in &self.detectors {
            match detector {
                Detector::CustomTerm(term) => {
                    issues.extend(custom_term_issue(page.url, page.text, term));
                }
                Detector::Precursor(rule) => {
                    issues.extend(precursor_issues(page.url, page.text, rule));
                }
                Detector::Linter { ignore_words } => {
                    issues.extend(linter.check_page(page.url, page.text, ignore_words).await);
                }
                Detector::BrokenLinks => {
                    issues.extend(probe_links(fetcher, page.url, page.links).await);
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn job() -> CrawlJob {
        CrawlJob {
            id: "job".to_string(),
            base_url: "https://acme.com".to_string(),
            max_pages: 10,
            find_word: None,
            precursor_rule: None,
            ignore_words: Vec::new(),
            delay: Duration::ZERO,
            find_broken_links: false,
        }
    }

    fn names(set: &DetectorSet) -> Vec<&'static str> {
        set.detectors().iter().map(Detector::name).collect()
    }

    #[test]
    fn linter_runs_when_no_custom_term() {
        assert_eq!(names(&DetectorSet::for_job(&job())), vec!["linter"]);
    }

    #[test]
    fn custom_term_replaces_linter_but_not_precursor() {
        let job = CrawlJob {
            find_word: Some("AcmeWidget".to_string()),
            precursor_rule: PrecursorRule::new("Octane ", "Sites"),
            find_broken_links: true,
            ..job()
        };
        assert_eq!(
            names(&DetectorSet::for_job(&job)),
            vec!["custom_term", "precursor", "broken_links"]
        );
    }

    #[test]
    fn empty_custom_term_keeps_linter() {
        let job = CrawlJob {
            find_word: Some(String::new()),
            ..job()
        };
        assert_eq!(names(&DetectorSet::for_job(&job)), vec!["linter"]);
    }
}
