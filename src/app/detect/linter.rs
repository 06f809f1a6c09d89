//! Client for the external grammar/spelling service (LanguageTool's
//! `/v2/check` API).

use serde::Deserialize;
use tracing::{debug, warn};

use crate::app::error::LintError;
use crate::app::types::{Issue, IssueKind, ScanConfig};

/// Context snippets mentioning these are page chrome, not prose.
const BOILERPLATE_MARKERS: [&str; 2] = ["javascript", "cdn-cgi"];

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<LintMatch>,
}

#[derive(Debug, Deserialize)]
struct LintMatch {
    message: String,
    #[serde(default)]
    replacements: Vec<Replacement>,
    context: MatchContext,
    rule: MatchRule,
}

#[derive(Debug, Deserialize)]
struct Replacement {
    value: String,
}

#[derive(Debug, Deserialize)]
struct MatchContext {
    text: String,
}

#[derive(Debug, Deserialize)]
struct MatchRule {
    id: String,
}

#[derive(Debug, Clone)]
pub struct Linter {
    client: reqwest::Client,
    endpoint: String,
    language: String,
    chunk_chars: usize,
}

impl Linter {
    pub fn new(client: reqwest::Client, config: &ScanConfig) -> Self {
        Self {
            client,
            endpoint: config.linter_endpoint.clone(),
            language: config.linter_language.clone(),
            chunk_chars: config.lint_chunk_chars.max(1),
        }
    }

    /// Submits `text` chunk by chunk. A failing chunk is logged and skipped.
    pub async fn check_page(&self, url: &str, text: &str, ignore_words: &[String]) -> Vec<Issue> {
        let mut issues = Vec::new();
        for chunk in chunk_chars(text, self.chunk_chars) {
            match self.check_chunk(chunk).await {
                Ok(matches) => {
                    debug!(url, matches = matches.len(), "grammar chunk checked");
                    issues.extend(
                        matches
                            .into_iter()
                            .filter_map(|m| match_to_issue(url, m, ignore_words)),
                    );
                }
                Err(err) => warn!(url, error = %err, "grammar check failed"),
            }
        }
        issues
    }

    async fn check_chunk(&self, chunk: &str) -> Result<Vec<LintMatch>, LintError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("text", chunk), ("language", self.language.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LintError::Status(status.as_u16()));
        }
        let body = response.json::<CheckResponse>().await?;
        Ok(body.matches)
    }
}

fn match_to_issue(url: &str, m: LintMatch, ignore_words: &[String]) -> Option<Issue> {
    if should_skip(&m.context.text, ignore_words) {
        return None;
    }

    let kind = if m.rule.id.to_lowercase().contains("spelling") {
        IssueKind::Spelling
    } else {
        IssueKind::Grammar
    };
    let suggestions = m
        .replacements
        .iter()
        .map(|r| r.value.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let suggestions = if suggestions.is_empty() {
        "N/A".to_string()
    } else {
        suggestions
    };

    Some(Issue::new(kind, url, m.message, suggestions, m.context.text))
}

fn should_skip(context: &str, ignore_words: &[String]) -> bool {
    let context = context.to_lowercase();
    BOILERPLATE_MARKERS.iter().any(|marker| context.contains(marker))
        || ignore_words
            .iter()
            .filter(|word| !word.is_empty())
            .any(|word| context.contains(&word.to_lowercase()))
}

/// Splits into pieces of at most `size` characters.
fn chunk_chars(text: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}
