//! Migration CSV export.

use chrono::Utc;
use serde::Serialize;
use url::Url;

use super::error::ScanError;
use super::types::{BlogMetadata, PageRecord};

const CSV_HEADERS: [&str; 18] = [
    "pageid",
    "pageparent",
    "pagetitle",
    "pagelive",
    "pageintrash",
    "titletag",
    "metadesc",
    "publishdate",
    "oldurl",
    "pagedata",
    "post_type",
    "published",
    "fix_images",
    "blogcategories",
    "tags",
    "overrideurl",
    "noindex",
    "imagefile",
];

const BLOG_CATEGORY: &str = "blog/category/general";

#[derive(Debug, Clone, Copy, Serialize)]
struct PageImage<'a> {
    imagefile: &'a str,
    alt: &'a str,
}

/// The `pagedata` JSON payload; field order is part of the import format.
#[derive(Debug, Serialize)]
struct PageData<'a> {
    title: &'a str,
    #[serde(rename = "display-title")]
    display_title: &'a str,
    #[serde(rename = "article-author")]
    article_author: &'a str,
    #[serde(rename = "preview-image")]
    preview_image: PageImage<'a>,
    #[serde(rename = "hero-image")]
    hero_image: PageImage<'a>,
    content: &'a str,
}

pub fn csv_headers(include_imagefile: bool) -> &'static [&'static str] {
    if include_imagefile {
        &CSV_HEADERS
    } else {
        &CSV_HEADERS[..CSV_HEADERS.len() - 1]
    }
}

/// Builds the record for a successfully parsed blog post.
pub fn page_record_from_metadata(url: &str, meta: &BlogMetadata) -> PageRecord {
    let image = PageImage {
        imagefile: &meta.first_image,
        alt: &meta.title,
    };
    let pagedata = PageData {
        title: &meta.title,
        display_title: &meta.title,
        article_author: "",
        preview_image: image,
        hero_image: image,
        content: &meta.content_html,
    };

    PageRecord {
        pageid: String::new(),
        pageparent: 0,
        pagetitle: meta.title.clone(),
        pagelive: "live".to_string(),
        pageintrash: 0,
        titletag: meta.title_tag.clone(),
        metadesc: meta.description.clone(),
        publishdate: meta.publish_date.clone(),
        oldurl: url.to_string(),
        pagedata: serde_json::to_string(&pagedata).unwrap_or_default(),
        post_type: "post".to_string(),
        published: "yes".to_string(),
        fix_images: "TRUE".to_string(),
        blogcategories: BLOG_CATEGORY.to_string(),
        tags: String::new(),
        overrideurl: override_slug(url),
        noindex: if meta.noindex { "yes" } else { "no" }.to_string(),
        imagefile: meta.first_image.clone(),
    }
}

fn override_slug(url: &str) -> String {
    Url::parse(url)
        .map(|u| {
            let path = u.path();
            path.strip_prefix('/').unwrap_or(path).to_string()
        })
        .unwrap_or_default()
}

/// Serializes the exportable records; the header row is always written.
pub fn write_page_records(
    records: &[PageRecord],
    include_imagefile: bool,
) -> Result<String, ScanError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(csv_headers(include_imagefile))?;

    for rec in records.iter().filter(|rec| rec.is_exportable()) {
        let mut row = vec![
            rec.pageid.clone(),
            rec.pageparent.to_string(),
            rec.pagetitle.clone(),
            rec.pagelive.clone(),
            rec.pageintrash.to_string(),
            rec.titletag.clone(),
            rec.metadesc.clone(),
            rec.publishdate.clone(),
            rec.oldurl.clone(),
            rec.pagedata.clone(),
            rec.post_type.clone(),
            rec.published.clone(),
            rec.fix_images.clone(),
            rec.blogcategories.clone(),
            rec.tags.clone(),
            rec.overrideurl.clone(),
            rec.noindex.clone(),
        ];
        if include_imagefile {
            row.push(rec.imagefile.clone());
        }
        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| ScanError::Csv(err.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn default_output_path(url: &str) -> String {
    let host = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "blogs".to_string());
    let host = host
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>();
    let ts = Utc::now().format("%Y%m%d_%H%M%S");
    format!("{host}_{ts}.csv")
}
