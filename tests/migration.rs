mod common;

use mockito::Server;
use proofcrawl::app::runtime::Engine;
use proofcrawl::app::types::{JobStatus, MigrationJob, MigrationTarget};

use common::{html_mock, test_config};

fn blog_post(title: &str) -> String {
    format!(
        r#"<html><head>
<title>{title} | Acme Blog</title>
<meta property="og:title" content="{title}">
<meta name="description" content="About {title}">
<meta property="article:published_time" content="2024-02-03">
</head><body>
<article><p>Body of {title}</p><img src="/img/{title}.jpg" alt="x"></article>
<a href="/blog">Back</a>
</body></html>"#
    )
}

#[tokio::test]
async fn discovered_posts_export_as_csv_without_failures() {
    let mut server = Server::new_async().await;
    let index = (1..=5)
        .map(|n| format!(r#"<a href="/blog/post-{n}">Post {n}</a>"#))
        .collect::<String>();
    html_mock(
        &mut server,
        "/blog",
        &format!(r#"<html><body>{index}<a href="/about">About</a></body></html>"#),
    )
    .await;
    for n in 1..=4 {
        html_mock(&mut server, &format!("/blog/post-{n}"), &blog_post(&format!("Post{n}"))).await;
    }
    server.mock("GET", "/blog/post-5").with_status(500).create_async().await;
    let about = server.mock("GET", "/about").expect(0).create_async().await;

    let engine = Engine::new(test_config(&server));
    let base_url = format!("{}/blog", server.url());
    let export = engine
        .migration(MigrationJob {
            id: "blogs-1".to_string(),
            base_url: base_url.clone(),
            target: MigrationTarget::AllBlogs { max_pages: 10 },
        })
        .await
        .unwrap();

    assert_eq!(export.records, 4);
    assert_eq!(export.summary, format!("Crawled 4 blog posts from {base_url}"));

    let lines = export.csv.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].ends_with(",overrideurl,noindex"));

    let mut reader = csv::Reader::from_reader(export.csv.as_bytes());
    let first = reader.records().next().unwrap().unwrap();
    assert_eq!(&first[2], "Post1");
    assert_eq!(&first[5], "Post1 | Acme Blog");
    assert_eq!(&first[7], "2024-02-03");
    assert_eq!(&first[8], format!("{}/blog/post-1", server.url()));
    assert_eq!(&first[15], "blog/post-1");
    assert_eq!(&first[16], "no");

    about.assert_async().await;
    let progress = engine.progress("blogs-1");
    assert_eq!(progress.status, JobStatus::Done);
    assert_eq!(progress.total, Some(5));
}

#[tokio::test]
async fn discovery_stops_at_requested_count() {
    let mut server = Server::new_async().await;
    let index = (1..=6)
        .map(|n| format!(r#"<a href="/blog/p{n}">P{n}</a>"#))
        .collect::<String>();
    html_mock(&mut server, "/blog", &format!("<html><body>{index}</body></html>")).await;
    for n in 1..=6 {
        html_mock(&mut server, &format!("/blog/p{n}"), &blog_post(&format!("P{n}"))).await;
    }

    let engine = Engine::new(test_config(&server));
    let export = engine
        .migration(MigrationJob {
            id: "blogs-2".to_string(),
            base_url: format!("{}/blog", server.url()),
            target: MigrationTarget::AllBlogs { max_pages: 2 },
        })
        .await
        .unwrap();

    assert_eq!(export.records, 2);
}

#[tokio::test]
async fn listed_slugs_export_with_image_column() {
    let mut server = Server::new_async().await;
    html_mock(&mut server, "/blog/first/", &blog_post("First")).await;
    html_mock(&mut server, "/blog/second/", &blog_post("Second")).await;
    server.mock("GET", "/blog/gone/").with_status(404).create_async().await;

    let engine = Engine::new(test_config(&server));
    let base_url = format!("{}/blog/", server.url());
    let export = engine
        .migration(MigrationJob {
            id: "blogs-3".to_string(),
            base_url: base_url.clone(),
            target: MigrationTarget::SpecificBlogs {
                slugs: vec!["first".to_string(), "second/".to_string(), "gone".to_string()],
            },
        })
        .await
        .unwrap();

    assert_eq!(
        export.summary,
        format!("Processed 2 selected blog posts from {base_url}")
    );
    let mut reader = csv::Reader::from_reader(export.csv.as_bytes());
    assert_eq!(reader.headers().unwrap().len(), 18);
    let rows = reader.records().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[0][17], "/img/First.jpg");
    assert_eq!(&rows[1][15], "blog/second/");

    let progress = engine.progress("blogs-3");
    assert_eq!(progress.percent, 100);
    assert_eq!(progress.visited, Some(3));
}

#[tokio::test]
async fn discovered_urls_keep_trailing_slash() {
    let mut server = Server::new_async().await;
    html_mock(
        &mut server,
        "/blog",
        r#"<html><body><a href="/blog/post-1/">Post 1</a></body></html>"#,
    )
    .await;
    html_mock(&mut server, "/blog/post-1/", &blog_post("Post1")).await;

    let engine = Engine::new(test_config(&server));
    let export = engine
        .migration(MigrationJob {
            id: "blogs-4".to_string(),
            base_url: format!("{}/blog", server.url()),
            target: MigrationTarget::AllBlogs { max_pages: 1 },
        })
        .await
        .unwrap();

    let mut reader = csv::Reader::from_reader(export.csv.as_bytes());
    let row = reader.records().next().unwrap().unwrap();
    assert_eq!(&row[8], format!("{}/blog/post-1/", server.url()));
    assert_eq!(&row[15], "blog/post-1/");
}
