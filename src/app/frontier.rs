//! Visited/pending bookkeeping for one crawl.
//!
//! URLs are handed out in the order they were first discovered. A URL is
//! fetched at most once and the crawl stops at the page budget.

use std::collections::{HashSet, VecDeque};

use url::{Origin, Url};

use super::error::ScanError;

const IMAGE_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".png", ".svg", ".gif", ".webp"];

/// Which discovered URLs a crawl is allowed to follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Same scheme, host and port as the seed.
    SameOrigin(Origin),
    /// URL text must start with this prefix.
    Prefix(String),
}

impl Scope {
    pub fn same_origin_as(seed: &str) -> Result<Self, ScanError> {
        let url = parse_absolute(seed)?;
        if url.host_str().is_none() {
            return Err(ScanError::InvalidUrl {
                url: seed.to_string(),
                reason: "URL has no host".to_string(),
            });
        }
        Ok(Scope::SameOrigin(url.origin()))
    }

    pub fn allows(&self, url: &str) -> bool {
        match self {
            Scope::SameOrigin(origin) => is_same_origin(url, origin),
            Scope::Prefix(prefix) => url.starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug)]
pub struct Frontier {
    scope: Scope,
    budget: usize,
    visited: HashSet<String>,
    queued: HashSet<String>,
    pending: VecDeque<String>,
}

impl Frontier {
    /// Seeds the frontier with `seed`, which is always in scope.
    pub fn new(seed: &str, budget: usize, scope: Scope) -> Result<Self, ScanError> {
        let seed = normalize_crawl_url(seed).ok_or_else(|| ScanError::InvalidUrl {
            url: seed.to_string(),
            reason: "not an http(s) URL".to_string(),
        })?;

        let mut frontier = Self {
            scope,
            budget,
            visited: HashSet::new(),
            queued: HashSet::new(),
            pending: VecDeque::new(),
        };
        frontier.queued.insert(seed.clone());
        frontier.pending.push_back(seed);
        Ok(frontier)
    }

    /// Pops the oldest pending URL, or `None` once the frontier is exhausted.
    pub fn next(&mut self) -> Option<String> {
        if self.budget_reached() {
            return None;
        }
        let url = self.pending.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    /// Returns false if the URL had already been visited.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.queued.remove(url);
        self.pending.retain(|pending| pending != url);
        self.visited.insert(url.to_string())
    }

    /// Queues a discovered URL. Out-of-scope, already visited and already
    /// queued URLs are dropped silently.
    pub fn offer(&mut self, url: &str) -> bool {
        let Some(url) = normalize_crawl_url(url) else {
            return false;
        };
        if url.contains("/cdn-cgi/") || !self.scope.allows(&url) {
            return false;
        }
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.pending.push_back(url);
        true
    }

    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty() || self.budget_reached()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    fn budget_reached(&self) -> bool {
        self.visited.len() >= self.budget
    }
}

fn parse_absolute(raw: &str) -> Result<Url, ScanError> {
    Url::parse(raw.trim()).map_err(|err| ScanError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })
}

pub fn is_same_origin(candidate: &str, origin: &Origin) -> bool {
    Url::parse(candidate).is_ok_and(|u| &u.origin() == origin)
}

/// Canonical form used for every visited/pending comparison: http(s) only,
/// no fragment, no tracking parameters, no trailing slash.
pub fn normalize_crawl_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut url = Url::parse(trimmed).ok()?;
    let scheme = url.scheme().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return None;
    }

    let kept_params = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if is_tracking_query_param(&k) {
                None
            } else {
                Some((k.into_owned(), v.into_owned()))
            }
        })
        .collect::<Vec<_>>();
    if kept_params.is_empty() {
        url.set_query(None);
    } else {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (k, v) in kept_params {
            serializer.append_pair(&k, &v);
        }
        url.set_query(Some(&serializer.finish()));
    }

    url.set_fragment(None);
    Some(url.as_str().trim_end_matches('/').to_string())
}

fn is_tracking_query_param(param: &str) -> bool {
    let name = param.to_ascii_lowercase();
    if name.starts_with("utm_") || name.starts_with("gad_") {
        return true;
    }
    matches!(
        name.as_str(),
        "gclid" | "fbclid" | "gbraid" | "wbraid" | "_gl" | "mc_cid" | "mc_eid"
    )
}

/// False for hrefs that never point at page content: anchors, `mailto:`,
/// `tel:`, `javascript:` and a bare `/`.
pub fn is_content_href(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return false;
    }
    if href.chars().all(|ch| ch == '/') {
        return false;
    }
    let lower = href.to_ascii_lowercase();
    !(lower.starts_with("mailto:") || lower.starts_with("tel:") || lower.starts_with("javascript:"))
}

pub fn is_image_target(url: &str) -> bool {
    let path = Url::parse(url)
        .map(|u| u.path().to_ascii_lowercase())
        .unwrap_or_else(|_| url.to_ascii_lowercase());
    IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Resolves `href` against the page it was found on and normalizes it.
/// Joins `href` onto `page_url` and returns the absolute URL exactly as
/// serialized, without normalization. Non-content and non-http(s) hrefs yield
/// `None`.
pub fn join_href(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if !is_content_href(href) {
        return None;
    }

    let joined = Url::parse(page_url).ok()?.join(href).ok()?;
    match joined.scheme() {
        "http" | "https" => Some(joined.to_string()),
        _ => None,
    }
}

pub fn resolve_href(page_url: &str, href: &str) -> Option<String> {
    normalize_crawl_url(&join_href(page_url, href)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frontier(seed: &str, budget: usize) -> Frontier {
        Frontier::new(seed, budget, Scope::same_origin_as(seed).unwrap()).unwrap()
    }

    #[test]
    fn hands_out_urls_in_discovery_order() {
        let mut f = frontier("https://example.com/", 10);
        let seed = f.next().unwrap();
        assert_eq!(seed, "https://example.com");
        f.mark_visited(&seed);

        assert!(f.offer("https://example.com/b"));
        assert!(f.offer("https://example.com/a"));
        assert!(f.offer("https://example.com/c"));

        assert_eq!(f.next().as_deref(), Some("https://example.com/b"));
        assert_eq!(f.next().as_deref(), Some("https://example.com/a"));
        assert_eq!(f.next().as_deref(), Some("https://example.com/c"));
        assert!(f.next().is_none());
    }

    #[test]
    fn never_requeues_visited_or_pending_urls() {
        let mut f = frontier("https://example.com", 10);
        let seed = f.next().unwrap();
        f.mark_visited(&seed);

        assert!(!f.offer("https://example.com/"));
        assert!(f.offer("https://example.com/about"));
        assert!(!f.offer("https://example.com/about/"));
        assert!(!f.offer("  https://example.com/about#team "));
        assert_eq!(f.pending_count(), 1);

        let about = f.next().unwrap();
        assert!(f.mark_visited(&about));
        assert!(!f.mark_visited(&about));
        assert!(!f.offer("https://example.com/about"));
        assert_eq!(f.visited_count(), 2);
    }

    #[test]
    fn drops_out_of_scope_and_cdn_urls() {
        let mut f = frontier("https://example.com", 10);
        assert!(!f.offer("https://other.org/page"));
        assert!(!f.offer("mailto:hi@example.com"));
        assert!(!f.offer("https://example.com/cdn-cgi/l/email-protection"));
        assert!(f.offer("https://EXAMPLE.com/contact"));
    }

    #[test]
    fn stops_at_page_budget() {
        let mut f = frontier("https://example.com", 2);
        let seed = f.next().unwrap();
        f.mark_visited(&seed);
        f.offer("https://example.com/a");
        f.offer("https://example.com/b");

        let a = f.next().unwrap();
        f.mark_visited(&a);
        assert!(f.is_exhausted());
        assert!(f.next().is_none());
        assert_eq!(f.visited_count(), f.budget());
    }

    #[test]
    fn other_schemes_and_ports_are_out_of_scope() {
        let mut f = frontier("https://example.com", 10);
        assert!(!f.offer("http://example.com/about"));
        assert!(!f.offer("https://example.com:8443/about"));
        assert!(f.offer("https://example.com:443/about"));
        assert_eq!(f.pending_count(), 1);
    }

    #[test]
    fn joined_hrefs_keep_their_shape() {
        let page = "https://example.com/blog";
        assert_eq!(
            join_href(page, "/blog/post-1/?utm_source=x"),
            Some("https://example.com/blog/post-1/?utm_source=x".to_string())
        );
        assert_eq!(
            resolve_href(page, "/blog/post-1/?utm_source=x"),
            Some("https://example.com/blog/post-1".to_string())
        );
        assert_eq!(join_href(page, "ftp://example.com/file"), None);
    }

    #[test]
    fn prefix_scope_limits_expansion() {
        let scope = Scope::Prefix("https://example.com/news".to_string());
        let mut f = Frontier::new("https://example.com/news", 10, scope).unwrap();
        assert!(f.offer("https://example.com/news/page/2"));
        assert!(!f.offer("https://example.com/shop"));
    }

    #[test]
    fn relative_links_resolve_identically_with_or_without_trailing_slash() {
        let page = "https://example.com/blog/post";
        assert_eq!(
            resolve_href(page, "/about"),
            Some("https://example.com/about".to_string())
        );
        assert_eq!(resolve_href(page, "/about/"), resolve_href(page, "/about"));
        assert_eq!(
            resolve_href(page, "other/"),
            Some("https://example.com/blog/other".to_string())
        );
    }

    #[test]
    fn rejects_non_content_hrefs() {
        for href in ["", "#top", "/", "//", "mailto:a@b.c", "tel:123", "JavaScript:void(0)"] {
            assert!(!is_content_href(href), "{href} should be rejected");
        }
        assert!(is_content_href("/pricing"));
        assert!(is_content_href("https://example.com"));
    }

    #[test]
    fn strips_tracking_parameters() {
        assert_eq!(
            normalize_crawl_url("https://example.com/a?utm_source=x&id=3#frag").as_deref(),
            Some("https://example.com/a?id=3")
        );
    }

    #[test]
    fn recognizes_image_targets() {
        assert!(is_image_target("https://example.com/img/hero.JPG"));
        assert!(is_image_target("https://example.com/logo.svg?v=2"));
        assert!(!is_image_target("https://example.com/gallery"));
    }
}
