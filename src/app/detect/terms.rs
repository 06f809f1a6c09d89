//! Local text rules: the custom-term matcher and the precursor rule.

use crate::app::types::{Issue, IssueKind, PrecursorRule};

const CONTEXT_RADIUS: usize = 40;

/// One `grammar` issue if `term` occurs anywhere in `text`, ignoring case.
pub fn custom_term_issue(url: &str, text: &str, term: &str) -> Option<Issue> {
    let needle = term.to_lowercase();
    if needle.is_empty() || !text.to_lowercase().contains(&needle) {
        return None;
    }

    let context = text
        .split('.')
        .find(|sentence| sentence.to_lowercase().contains(&needle))
        .map(str::trim)
        .unwrap_or("Context not found");

    Some(Issue::new(
        IssueKind::Grammar,
        url,
        format!("Custom term match found: \"{term}\""),
        "Possible typo or incorrect brand name",
        context,
    ))
}

/// One `grammar` issue per occurrence of the phrase that is not directly
/// preceded by the precursor. Both are matched as literal text, ignoring case.
pub fn precursor_issues(url: &str, text: &str, rule: &PrecursorRule) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut idx = 0;

    while idx < text.len() {
        let rest = &text[idx..];
        if let Some(len) = match_len_ignore_case(rest, &rule.phrase) {
            if !ends_with_ignore_case(&text[..idx], &rule.precursor) {
                issues.push(Issue::new(
                    IssueKind::Grammar,
                    url,
                    format!(
                        "Missing precursor \"{}\" before \"{}\"",
                        rule.precursor, rule.phrase
                    ),
                    format!(
                        "Consider rewriting as \"{}{}\"",
                        rule.precursor, rule.phrase
                    ),
                    context_window(text, idx),
                ));
                idx += len;
                continue;
            }
        }
        idx += rest.chars().next().map_or(1, char::len_utf8);
    }

    issues
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte length of the prefix of `hay` matching `needle`, if it matches.
fn match_len_ignore_case(hay: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let mut hay_chars = hay.char_indices();
    for expected in needle.chars() {
        let (_, actual) = hay_chars.next()?;
        if !chars_eq_ignore_case(actual, expected) {
            return None;
        }
    }
    Some(hay_chars.next().map_or(hay.len(), |(end, _)| end))
}

fn ends_with_ignore_case(hay: &str, needle: &str) -> bool {
    let mut hay_chars = hay.chars().rev();
    needle
        .chars()
        .rev()
        .all(|expected| hay_chars.next().is_some_and(|actual| chars_eq_ignore_case(actual, expected)))
}

/// Up to 40 characters either side of the byte offset `at`, trimmed.
fn context_window(text: &str, at: usize) -> String {
    let start = text[..at]
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS - 1)
        .map_or(0, |(i, _)| i);
    let end = text[at..]
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map_or(text.len(), |(i, _)| at + i);
    text[start..end].trim().to_string()
}
