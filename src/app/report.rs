//! Plain-text grammar scan report.

use std::fmt::Write as _;

use url::Url;

use super::types::{Issue, IssueKind, ScanOutcome};

const RECOMMENDATIONS: [&str; 4] = [
    "Review possessive vs. contraction usage",
    "Add commas in compound sentences",
    "Run spell check on blog content",
    "Update broken external links",
];

/// Renders the report for a finished scan. Sections without issues are left out.
pub fn render_report(outcome: &ScanOutcome) -> String {
    let grammar = issues_of(&outcome.issues, IssueKind::Grammar);
    let spelling = issues_of(&outcome.issues, IssueKind::Spelling);
    let broken = issues_of(&outcome.issues, IssueKind::Broken);

    let mut out = String::new();
    out.push_str("Grammar Crawler Results\n");
    out.push_str("===========================\n\n");
    let _ = writeln!(out, "Domain: {}", outcome.domain);
    let _ = writeln!(out, "Pages Analyzed: {}", outcome.pages_analyzed);
    let _ = writeln!(
        out,
        "Scan Duration: {:.1} seconds\n",
        outcome.duration.as_secs_f64()
    );

    if !grammar.is_empty() {
        out.push_str("GRAMMAR ISSUES FOUND:\n---------------------\n");
        for (i, issue) in grammar.iter().enumerate() {
            let _ = write!(
                out,
                "{}. Page: {}\n   Issue: {}\n   Line: \"{}\"\n\n",
                i + 1,
                page_path(&issue.url),
                issue.message,
                issue.context
            );
        }
    }

    if !spelling.is_empty() {
        out.push_str("SPELLING ERRORS:\n----------------\n");
        for (i, issue) in spelling.iter().enumerate() {
            let _ = write!(
                out,
                "{}. Page: {}\n   Error: {}\n\n",
                i + 1,
                page_path(&issue.url),
                issue.message
            );
        }
    }

    if !broken.is_empty() {
        out.push_str("BROKEN LINKS:\n-------------\n");
        for (i, issue) in broken.iter().enumerate() {
            let _ = write!(
                out,
                "{}. Page: {}\n   Link: {}\n   Status: {}\n\n",
                i + 1,
                page_path(&issue.url),
                issue.context,
                issue.message
            );
        }
    }

    out.push_str("SUMMARY:\n--------\n");
    let _ = writeln!(out, "Total Issues: {}", outcome.issues.len());
    let _ = writeln!(out, "Grammar: {}", grammar.len());
    let _ = writeln!(out, "Spelling: {}", spelling.len());
    let _ = writeln!(out, "Broken Links: {}\n", broken.len());
    out.push_str("Recommendations:\n");
    for line in RECOMMENDATIONS {
        let _ = writeln!(out, "- {line}");
    }

    out
}

fn issues_of(issues: &[Issue], kind: IssueKind) -> Vec<&Issue> {
    issues.iter().filter(|issue| issue.kind == kind).collect()
}

fn page_path(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn outcome(issues: Vec<Issue>) -> ScanOutcome {
        ScanOutcome {
            domain: "https://acme.com".to_string(),
            pages_analyzed: 3,
            duration: Duration::from_millis(2_340),
            issues,
        }
    }

    #[test]
    fn empty_scan_has_header_and_summary_only() {
        let report = render_report(&outcome(Vec::new()));
        assert_eq!(
            report,
            "Grammar Crawler Results\n\
             ===========================\n\n\
             Domain: https://acme.com\n\
             Pages Analyzed: 3\n\
             Scan Duration: 2.3 seconds\n\n\
             SUMMARY:\n--------\n\
             Total Issues: 0\n\
             Grammar: 0\n\
             Spelling: 0\n\
             Broken Links: 0\n\n\
             Recommendations:\n\
             - Review possessive vs. contraction usage\n\
             - Add commas in compound sentences\n\
             - Run spell check on blog content\n\
             - Update broken external links\n"
        );
    }

    #[test]
    fn sections_list_issues_by_page_path() {
        let report = render_report(&outcome(vec![
            Issue::new(IssueKind::Grammar, "https://acme.com/about?x=1", "Use a comma", "N/A", "it rained we left"),
            Issue::new(IssueKind::Broken, "https://acme.com/", "Broken link", "N/A", "https://gone.example/"),
            Issue::new(IssueKind::Grammar, "https://acme.com/team", "Missing precursor", "N/A", "Sites Inc"),
        ]));

        assert!(report.contains(
            "GRAMMAR ISSUES FOUND:\n---------------------\n\
             1. Page: /about\n   Issue: Use a comma\n   Line: \"it rained we left\"\n\n\
             2. Page: /team\n   Issue: Missing precursor\n   Line: \"Sites Inc\"\n\n"
        ));
        assert!(report.contains(
            "BROKEN LINKS:\n-------------\n\
             1. Page: /\n   Link: https://gone.example/\n   Status: Broken link\n\n"
        ));
        assert!(report.contains("Total Issues: 3\nGrammar: 2\nSpelling: 0\nBroken Links: 1\n"));
    }

    #[test]
    fn spelling_section_omitted_without_spelling_issues() {
        let report = render_report(&outcome(vec![Issue::new(
            IssueKind::Grammar,
            "https://acme.com/",
            "m",
            "N/A",
            "c",
        )]));
        assert!(!report.contains("SPELLING ERRORS"));
        assert!(!report.contains("BROKEN LINKS:"));

        let report = render_report(&outcome(vec![Issue::new(
            IssueKind::Spelling,
            "https://acme.com/blog",
            "Possible spelling mistake",
            "the",
            "teh",
        )]));
        assert!(report.contains(
            "SPELLING ERRORS:\n----------------\n1. Page: /blog\n   Error: Possible spelling mistake\n\n"
        ));
    }

    #[test]
    fn rendering_is_idempotent() {
        let scan = outcome(vec![
            Issue::new(IssueKind::Spelling, "https://acme.com/a", "m1", "x", "c1"),
            Issue::new(IssueKind::Broken, "https://acme.com/b", "Broken link", "N/A", "https://x.test/"),
        ]);
        assert_eq!(render_report(&scan), render_report(&scan));
    }
}
