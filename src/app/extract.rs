//! Turns fetched HTML into the inputs of the checks: visible text (with image
//! alt text), outbound links, and blog metadata for migration exports.

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use super::frontier::{is_image_target, join_href, resolve_href};
use super::types::BlogMetadata;

const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "noscript"];
const ARTICLE_CONTAINERS: &str = "article, .content, .postcontent";
const ARTICLE_IMAGES: &str = "article img, .postcontent img, .content img";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    /// Text and links only.
    Text,
    /// Text, links and blog metadata.
    Blog,
}

#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub text: String,
    pub links: Vec<String>,
    pub metadata: Option<BlogMetadata>,
}

/// Parses `html` fetched from `page_url`. The parsed document never leaves
/// this function, so the result can be held across awaits.
pub fn extract(html: &str, page_url: &str, mode: ExtractMode) -> Extraction {
    let doc = Html::parse_document(html);

    let body_text = visible_text(&doc);
    let alt_text = image_alt_text(&doc);
    let text = format!("{body_text} {alt_text}").trim().to_string();

    let metadata = match mode {
        ExtractMode::Text => None,
        ExtractMode::Blog => Some(blog_metadata(&doc)),
    };

    Extraction {
        text,
        links: extract_links(&doc, page_url),
        metadata,
    }
}

/// Outbound links only, for pages whose text is not needed. Links keep the
/// exact form they were joined to, so trailing slashes and query strings
/// survive; callers normalize when they need a crawl key.
pub fn page_links(html: &str, page_url: &str) -> Vec<String> {
    anchor_targets(&Html::parse_document(html), page_url, join_href)
}

/// Truncates to at most `max_chars` characters.
pub fn cap_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn is_hidden_tag(name: &str) -> bool {
    HIDDEN_ELEMENTS.contains(&name)
}

fn visible_text(doc: &Html) -> String {
    let Some(body) = select_first(doc, "body") else {
        return String::new();
    };

    let mut parts = Vec::new();
    for node in body.descendants() {
        if let Some(text) = node.value().as_text() {
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| is_hidden_tag(el.name()))
            });
            if !hidden {
                parts.push(&**text);
            }
        }
    }
    normalize_text(&parts.join(" "))
}

fn image_alt_text(doc: &Html) -> String {
    let selector = match Selector::parse("img[alt]") {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    doc.select(&selector)
        .filter(|el| {
            !el.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|parent| is_hidden_tag(parent.name()))
            })
        })
        .filter_map(|el| el.value().attr("alt"))
        .map(normalize_text)
        .filter(|alt| !alt.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Anchor targets resolved against the page, normalized, deduplicated, in
/// document order. Image files are skipped.
fn extract_links(doc: &Html, page_url: &str) -> Vec<String> {
    anchor_targets(doc, page_url, resolve_href)
}

fn anchor_targets(
    doc: &Html,
    page_url: &str,
    resolve: fn(&str, &str) -> Option<String>,
) -> Vec<String> {
    let selector = match Selector::parse("a[href]") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut out = Vec::new();
    let mut seen = HashSet::new();
    for el in doc.select(&selector) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve(page_url, href) else {
            continue;
        };
        if is_image_target(&resolved) {
            continue;
        }
        if seen.insert(resolved.clone()) {
            out.push(resolved);
        }
    }
    out
}

fn blog_metadata(doc: &Html) -> BlogMetadata {
    let og_title = extract_meta_content(doc, "meta[property=\"og:title\"]");
    let title = if og_title.is_empty() {
        extract_first_text(doc, "h1")
    } else {
        og_title
    };

    BlogMetadata {
        title,
        title_tag: extract_first_text(doc, "title"),
        description: extract_meta_content(doc, "meta[name=\"description\"]"),
        publish_date: extract_publish_date(doc),
        content_html: article_html(doc),
        first_image: first_article_image(doc),
        noindex: has_noindex_meta(doc),
    }
}

fn extract_publish_date(doc: &Html) -> String {
    for selector in [
        "meta[property=\"article:published_time\"]",
        "meta[name=\"pubdate\"]",
    ] {
        let value = extract_meta_content(doc, selector);
        if !value.is_empty() {
            return value;
        }
    }

    let Some(time) = select_first(doc, "time") else {
        return String::new();
    };
    match time.value().attr("datetime").map(str::trim) {
        Some(datetime) if !datetime.is_empty() => datetime.to_string(),
        _ => normalize_text(&time.text().collect::<Vec<_>>().join(" ")),
    }
}

fn article_html(doc: &Html) -> String {
    let selector = match Selector::parse(ARTICLE_CONTAINERS) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };
    doc.select(&selector).map(|el| el.inner_html()).collect()
}

fn first_article_image(doc: &Html) -> String {
    select_first(doc, ARTICLE_IMAGES)
        .and_then(|el| el.value().attr("src"))
        .map(|src| src.trim().to_string())
        .unwrap_or_default()
}

fn has_noindex_meta(doc: &Html) -> bool {
    select_first(doc, "meta[name=\"robots\"]")
        .and_then(|el| el.value().attr("content"))
        .map(|c| c.to_ascii_lowercase().contains("noindex"))
        .unwrap_or(false)
}

fn select_first<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector).next()
}

fn extract_first_text(doc: &Html, selector: &str) -> String {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    for el in doc.select(&selector) {
        let text = normalize_text(&el.text().collect::<Vec<_>>().join(" "));
        if !text.is_empty() {
            return text;
        }
    }

    String::new()
}

fn extract_meta_content(doc: &Html, selector: &str) -> String {
    let selector = match Selector::parse(selector) {
        Ok(s) => s,
        Err(_) => return String::new(),
    };

    doc.select(&selector)
        .find_map(|el| el.value().attr("content"))
        .map(normalize_text)
        .unwrap_or_default()
}

fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<!doctype html>
<html>
<head>
  <title> Widgets  | Acme </title>
  <meta property="og:title" content="All About Widgets">
  <meta name="description" content="Everything on widgets.">
  <meta property="article:published_time" content="2024-03-01T10:00:00Z">
  <meta name="robots" content="NOINDEX, follow">
  <style>body { color: red; }</style>
</head>
<body>
  <h1>Widgets</h1>
  <script>var hidden = "do not read";</script>
  <noscript>Enable JavaScript</noscript>
  <article>
    <p>Widgets are
       great.</p>
    <img src="/img/hero.png" alt="A shiny widget">
  </article>
  <a href="/about/">About</a>
  <a href="/about">About again</a>
  <a href="#top">Top</a>
  <a href="mailto:hi@acme.com">Mail</a>
  <a href="/files/brochure.PDF">Brochure</a>
  <a href="/img/photo.jpg">Photo</a>
  <a href="https://other.org/x">Elsewhere</a>
</body>
</html>"##;

    #[test]
    fn visible_text_skips_scripts_and_appends_alt_text() {
        let out = extract(PAGE, "https://acme.com/blog/widgets", ExtractMode::Text);
        assert!(out.text.starts_with("Widgets Widgets are great."));
        assert!(out.text.ends_with("A shiny widget"));
        assert!(!out.text.contains("do not read"));
        assert!(!out.text.contains("Enable JavaScript"));
        assert!(!out.text.contains("color: red"));
        assert!(out.metadata.is_none());
    }

    #[test]
    fn links_are_resolved_deduplicated_and_filtered() {
        let out = extract(PAGE, "https://acme.com/blog/widgets", ExtractMode::Text);
        assert_eq!(
            out.links,
            vec![
                "https://acme.com/about".to_string(),
                "https://acme.com/files/brochure.PDF".to_string(),
                "https://other.org/x".to_string(),
            ]
        );
    }

    #[test]
    fn page_links_keep_joined_form() {
        let links = page_links(PAGE, "https://acme.com/blog/widgets");
        assert_eq!(
            &links[..2],
            &[
                "https://acme.com/about/".to_string(),
                "https://acme.com/about".to_string(),
            ]
        );
        assert!(!links.iter().any(|l| l.ends_with("photo.jpg")));
    }

    #[test]
    fn blog_metadata_prefers_open_graph_title() {
        let out = extract(PAGE, "https://acme.com/blog/widgets", ExtractMode::Blog);
        let meta = out.metadata.unwrap();
        assert_eq!(meta.title, "All About Widgets");
        assert_eq!(meta.title_tag, "Widgets | Acme");
        assert_eq!(meta.description, "Everything on widgets.");
        assert_eq!(meta.publish_date, "2024-03-01T10:00:00Z");
        assert_eq!(meta.first_image, "/img/hero.png");
        assert!(meta.content_html.contains("<p>Widgets are"));
        assert!(meta.noindex);
    }

    #[test]
    fn blog_metadata_falls_back_to_h1_and_time_element() {
        let html = r#"<html><body>
            <h1> Fallback  Title </h1>
            <time datetime="">March 3, 2024</time>
            <div class="postcontent"><img src="a.png"><p>Body</p></div>
        </body></html>"#;
        let meta = extract(html, "https://acme.com/blog/x", ExtractMode::Blog)
            .metadata
            .unwrap();
        assert_eq!(meta.title, "Fallback Title");
        assert_eq!(meta.publish_date, "March 3, 2024");
        assert_eq!(meta.first_image, "a.png");
        assert_eq!(meta.description, "");
        assert!(!meta.noindex);
    }

    #[test]
    fn cap_chars_respects_char_boundaries() {
        assert_eq!(cap_chars("héllo", 2), "hé");
        assert_eq!(cap_chars("abc", 10), "abc");
    }
}
