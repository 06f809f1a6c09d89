use std::time::Duration;

use mockito::{Mock, ServerGuard};
use proofcrawl::app::types::{GrammarScanRequest, ScanConfig};

/// Engine settings pointing every outbound call at the mock server.
#[allow(dead_code)]
pub fn test_config(server: &ServerGuard) -> ScanConfig {
    ScanConfig {
        request_timeout: Duration::from_secs(5),
        linter_endpoint: format!("{}/v2/check", server.url()),
        preview_marker: "preview.invalid".to_string(),
        default_delay: Duration::ZERO,
        ..ScanConfig::default()
    }
}

#[allow(dead_code)]
pub fn html_page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>{title}</title></head>
<body>{body}</body>
</html>"#
    )
}

/// A scan of `base` with no delay that skips the external linter.
#[allow(dead_code)]
pub fn quiet_request(base: &str, max_pages: usize) -> GrammarScanRequest {
    GrammarScanRequest {
        base_domain: base.to_string(),
        max_pages,
        find_word: Some("zzz-not-present".to_string()),
        delay: Some(Duration::ZERO),
        ..GrammarScanRequest::default()
    }
}

#[allow(dead_code)]
pub async fn html_mock(server: &mut ServerGuard, path: &str, html: &str) -> Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_body(html)
        .create_async()
        .await
}
