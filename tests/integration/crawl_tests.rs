//! Integration tests for the mirror
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, writing into temporary directories.

use site_mirror::config::{Config, OverwritePolicy};
use site_mirror::crawler::crawl;
use site_mirror::MirrorError;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with no delays
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.delay_ms = 0;
    config.http.timeout_secs = 5;
    config.download.workers = 3;
    config.download.retries = 2;
    config.download.retry_delay_ms = 0;
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn mount_page(server: &MockServer, page: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn read(root: &Path, rel: &str) -> String {
    std::fs::read_to_string(root.join(rel)).unwrap_or_else(|e| panic!("{}: {}", rel, e))
}

#[tokio::test]
async fn test_seed_image_is_downloaded_and_rewritten() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<html><head><title>Home</title></head><body><img src="a.png"></body></html>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNGDATA".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 0, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.pages_saved, 1);
    assert_eq!(report.resources_downloaded, 1);
    assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), b"PNGDATA");

    let saved = read(dir.path(), "index.html");
    assert!(saved.contains(r#"<img src="a.png">"#));
    assert!(saved.contains("<title>Home</title>"));
}

#[tokio::test]
async fn test_absolute_reference_rewritten_to_relative_path() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/docs/guide",
        &format!(
            r#"<link rel="stylesheet" href="{}/css/site.css"><script src="../js/app.js"></script>"#,
            server.uri()
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/css/site.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("body{}"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/js/app.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("run()"))
        .mount(&server)
        .await;

    let seed = format!("{}/docs/guide", server.uri());
    crawl(&seed, 0, dir.path(), create_test_config())
        .await
        .unwrap();

    let saved = read(dir.path(), "docs/guide/index.html");
    assert!(saved.contains(r#"href="../../css/site.css""#));
    assert!(saved.contains(r#"src="../../js/app.js""#));
    assert_eq!(read(dir.path(), "css/site.css"), "body{}");
    assert_eq!(read(dir.path(), "js/app.js"), "run()");
}

#[tokio::test]
async fn test_depth_zero_does_not_follow_links() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", r#"<a href="/page2">Next</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html("<p>two</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 0, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.pages_saved, 1);
    assert_eq!(report.links_beyond_depth, 1);
    assert!(!dir.path().join("page2").exists());
    assert!(read(dir.path(), "index.html").contains(r#"<a href="/page2">"#));
}

#[tokio::test]
async fn test_depth_bound_is_respected() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", r#"<a href="/level1">1</a>"#).await;
    mount_page(&server, "/level1", r#"<a href="/level2">2</a>"#).await;
    mount_page(&server, "/level2", r#"<a href="/level3">3</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/level3"))
        .respond_with(html("too deep"))
        .expect(0)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 2, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.pages_saved, 3);
    assert!(dir.path().join("level1/index.html").exists());
    assert!(dir.path().join("level2/index.html").exists());
    assert!(!dir.path().join("level3").exists());
}

#[tokio::test]
async fn test_no_page_fetched_twice() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    for (page, body) in [
        ("/", r##"<a href="/a">a</a><a href="/b">b</a><a href="/a#part">again</a>"##),
        ("/a", r#"<a href="/b">b</a><a href="/">home</a>"#),
        ("/b", r#"<a href="/a">a</a><a href="./">home</a>"#),
    ] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 5, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.pages_saved, 3);
    assert_eq!(report.pages_failed, 0);
}

#[tokio::test]
async fn test_oversized_resource_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", r#"<video src="/big.mp4"></video>"#).await;
    Mock::given(method("GET"))
        .and(path("/big.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.download.max_file_size = Some(1024);

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 0, dir.path(), config).await.unwrap();

    assert_eq!(report.resources_too_large, 1);
    assert!(!dir.path().join("big.mp4").exists());
    assert!(!dir.path().join("big.mp4.part").exists());
    assert!(read(dir.path(), "index.html").contains(r#"<video src="/big.mp4">"#));
}

#[tokio::test]
async fn test_existing_file_is_left_untouched() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.png"), b"original").unwrap();

    mount_page(&server, "/", r#"<img src="a.png">"#).await;
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"newer".to_vec()))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.download.overwrite = OverwritePolicy::Skip;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 0, dir.path(), config).await.unwrap();

    assert_eq!(report.resources_existing, 1);
    assert_eq!(report.resources_skipped(), 1);
    assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), b"original");
    assert!(read(dir.path(), "index.html").contains(r#"<img src="a.png">"#));
}

#[tokio::test]
async fn test_overwrite_replaces_existing_file() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.png"), b"original").unwrap();

    mount_page(&server, "/", r#"<img src="a.png">"#).await;
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"newer".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.download.overwrite = OverwritePolicy::Overwrite;

    let seed = format!("{}/", server.uri());
    crawl(&seed, 0, dir.path(), config).await.unwrap();

    assert_eq!(std::fs::read(dir.path().join("a.png")).unwrap(), b"newer");
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", r#"<script src="/flaky.js"></script>"#).await;
    Mock::given(method("GET"))
        .and(path("/flaky.js"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky.js"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok()"))
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 0, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.resources_downloaded, 1);
    assert_eq!(report.resources_failed, 0);
    assert_eq!(read(dir.path(), "flaky.js"), "ok()");
    assert!(read(dir.path(), "index.html").contains(r#"<script src="flaky.js">"#));
}

#[tokio::test]
async fn test_failed_download_leaves_page_byte_identical() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let page = "<!DOCTYPE html>\n<html>\n<body>\n  <img src='missing.png' alt=\"gone\">\n  <img src=\"/broken.gif\">\n</body>\n</html>\n";
    mount_page(&server, "/", page).await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.gif"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 0, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.resources_failed, 2);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(read(dir.path(), "index.html"), page);
    assert!(!dir.path().join("missing.png").exists());
}

#[tokio::test]
async fn test_latin1_page_keeps_its_bytes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let page: &[u8] = b"<html><body><p>Se\xf1or caf\xe9</p><img src=\"/pic.png\" alt=\"\xe9\"><a href=\"/about\">\xe0 propos</a></body></html>";
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(page.to_vec())
                .insert_header("content-type", "text/html; charset=ISO-8859-1"),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/about", "<p>about</p>").await;
    Mock::given(method("GET"))
        .and(path("/pic.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PNG".to_vec()))
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 1, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.pages_saved, 2);
    assert_eq!(report.resources_downloaded, 1);
    assert_eq!(
        std::fs::read(dir.path().join("index.html")).unwrap(),
        b"<html><body><p>Se\xf1or caf\xe9</p><img src=\"pic.png\" alt=\"\xe9\"><a href=\"about/index.html\">\xe0 propos</a></body></html>".to_vec()
    );
}

#[tokio::test]
async fn test_nofollow_references_are_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<a href="/private" rel="nofollow">p</a><link rel="nofollow stylesheet" href="/hidden.css">"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(html("secret"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hidden.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x{}"))
        .expect(0)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 3, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.pages_saved, 1);
    assert_eq!(report.resources_downloaded, 0);
}

#[tokio::test]
async fn test_shared_resource_downloaded_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<link rel="stylesheet" href="/style.css"><a href="/blog/post">post</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/blog/post",
        r#"<link rel="stylesheet" href="/style.css"><link rel="stylesheet" href="/style.css">"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/style.css"))
        .respond_with(ResponseTemplate::new(200).set_body_string("p{}"))
        .expect(1)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 1, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.resources_downloaded, 1);
    let post = read(dir.path(), "blog/post/index.html");
    assert_eq!(post.matches(r#"href="../../style.css""#).count(), 2);
}

#[tokio::test]
async fn test_links_between_saved_pages_are_rewritten() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/",
        r#"<a href="/about#team">About</a><a href="/far">Far</a>"#,
    )
    .await;
    mount_page(&server, "/about", r#"<a href="/">Home</a>"#).await;
    mount_page(&server, "/far", r#"<a href="/farther">Farther</a>"#).await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 1, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.pages_saved, 3);

    let home = read(dir.path(), "index.html");
    assert!(home.contains(r#"<a href="about/index.html#team">"#));
    assert!(home.contains(r#"<a href="far/index.html">"#));

    let about = read(dir.path(), "about/index.html");
    assert!(about.contains(r#"<a href="../index.html">"#));

    // Never saved, so left pointing at the live site
    let far = read(dir.path(), "far/index.html");
    assert!(far.contains(r#"<a href="/farther">"#));
}

#[tokio::test]
async fn test_page_link_rewriting_can_be_disabled() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", r#"<a href="/about">About</a>"#).await;
    mount_page(&server, "/about", "<p>about</p>").await;

    let mut config = create_test_config();
    config.crawler.rewrite_page_links = false;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 1, dir.path(), config).await.unwrap();

    assert_eq!(report.page_links_rewritten, 0);
    assert!(read(dir.path(), "index.html").contains(r#"<a href="/about">"#));
}

#[tokio::test]
async fn test_anchor_to_document_is_downloaded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", r#"<a href="/files/report.pdf">Report</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/files/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let seed = format!("{}/", server.uri());
    crawl(&seed, 0, dir.path(), create_test_config())
        .await
        .unwrap();

    assert!(dir.path().join("files/report.pdf").exists());
    assert!(read(dir.path(), "index.html").contains(r#"<a href="files/report.pdf">"#));
}

#[tokio::test]
async fn test_failed_page_does_not_abort_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", r#"<a href="/missing">x</a><a href="/present">y</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_page(&server, "/present", "<p>here</p>").await;

    let seed = format!("{}/", server.uri());
    let report = crawl(&seed, 1, dir.path(), create_test_config())
        .await
        .unwrap();

    assert_eq!(report.pages_saved, 2);
    assert_eq!(report.pages_failed, 1);
    assert!(dir.path().join("present/index.html").exists());
    assert!(!dir.path().join("missing").exists());
}

#[tokio::test]
async fn test_invalid_seed_is_rejected() {
    let dir = TempDir::new().unwrap();

    for seed in ["not a url", "ftp://example.com/", "mailto:someone@example.com"] {
        let result = crawl(seed, 1, dir.path(), create_test_config()).await;
        assert!(
            matches!(result, Err(MirrorError::InvalidInput { .. })),
            "{} should be rejected",
            seed
        );
    }
}
