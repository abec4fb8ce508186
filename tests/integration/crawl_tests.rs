//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end. The mock server listens on 127.0.0.1, so links
//! written with `localhost` count as a different host.

use robocop::config::Config;
use robocop::crawler::{run_crawl, CrawlOutcome};
use robocop::output::{write_csv_file, ReportRow};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the given base URL
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.crawler.host = format!("{}/", base_url);
    config.crawler.random_delay = 0;
    config.crawler.request_timeout = 5;
    config.crawler.no_cache = true;
    config
}

fn html_page(links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">link</a>"#, href))
        .collect();
    let html = format!("<html><body>{}</body></html>", anchors);
    ResponseTemplate::new(200).set_body_raw(html.into_bytes(), "text/html")
}

/// `http://localhost:<port>`, the same server under another host name
fn localhost_url(base_url: &str) -> String {
    let port = url::Url::parse(base_url)
        .expect("Failed to parse base URL")
        .port()
        .expect("Mock server has an explicit port");
    format!("http://localhost:{}", port)
}

async fn requests_for(server: &MockServer, verb: &str, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.method.to_string() == verb && req.url.path() == request_path)
        .count()
}

fn row<'a>(rows: &'a [ReportRow], link: &str) -> Option<&'a ReportRow> {
    rows.iter().find(|row| row.link == link)
}

#[tokio::test]
async fn test_full_crawl_reports_broken_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let external = format!("{}/external", localhost_url(&base_url));

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&["/ok", "/missing", &external, "mailto:c@x.com"]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html_page(&["/missing"]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("HEAD"))
        .and(path("/external"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let report = run_crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.outcome, CrawlOutcome::Completed);

    let links: Vec<(&str, &str)> = report
        .rows
        .iter()
        .map(|row| (row.source_page.as_str(), row.link.as_str()))
        .collect();
    let seed = format!("{}/", base_url);
    let ok_page = format!("{}/ok", base_url);
    let missing = format!("{}/missing", base_url);
    assert_eq!(
        links,
        vec![
            (seed.as_str(), missing.as_str()),
            (seed.as_str(), external.as_str()),
            (ok_page.as_str(), missing.as_str()),
        ]
    );

    let missing_row = row(&report.rows, &missing).unwrap();
    assert_eq!(missing_row.link_status, 404);
    assert_eq!(
        missing_row.ssl_link.as_deref(),
        Some(missing.replacen("http://", "https://", 1).as_str())
    );
    assert_eq!(missing_row.ssl_status, None);

    // Off-site links are checked with HEAD only
    assert_eq!(row(&report.rows, &external).unwrap().link_status, 410);
    assert_eq!(requests_for(&mock_server, "GET", "/external").await, 0);

    // Each page is fetched once even when linked twice
    assert_eq!(requests_for(&mock_server, "GET", "/missing").await, 1);
}

#[tokio::test]
async fn test_visit_budget_limits_page_fetches() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&["/a", "/b"]))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.crawler.max_visits = 1;

    let report = run_crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(requests_for(&mock_server, "GET", "/").await, 1);
    assert_eq!(requests_for(&mock_server, "GET", "/a").await, 0);
    assert_eq!(requests_for(&mock_server, "GET", "/b").await, 0);

    // Links never fetched have no status and stay out of the report
    assert!(report.rows.is_empty());
}

#[tokio::test]
async fn test_redirect_into_disallowed_domain_uses_head() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let landing = format!("{}/landing", localhost_url(&base_url));

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&["/share"]))
        .mount(&mock_server)
        .await;

    Mock::given(path("/share"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", landing.as_str()))
        .mount(&mock_server)
        .await;

    Mock::given(path("/landing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.crawler.disallowed_domains = vec!["localhost".to_string()];

    let report = run_crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    let share = format!("{}/share", base_url);
    let share_row = row(&report.rows, &share).expect("share link reported");
    assert_eq!(share_row.link_status, 404);

    assert_eq!(requests_for(&mock_server, "GET", "/landing").await, 0);
    assert_eq!(requests_for(&mock_server, "HEAD", "/share").await, 1);
}

#[tokio::test]
async fn test_redirect_target_linked_directly_is_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&["/old", "/new"]))
        .mount(&mock_server)
        .await;

    Mock::given(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;

    Mock::given(path("/new"))
        .respond_with(html_page(&[]))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let report = run_crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(requests_for(&mock_server, "GET", "/new").await, 1);
}

#[tokio::test]
async fn test_page_reached_by_redirect_is_not_refetched() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&["/old"]))
        .mount(&mock_server)
        .await;

    Mock::given(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&mock_server)
        .await;

    Mock::given(path("/new"))
        .respond_with(html_page(&["/new", "/old"]))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.crawler.max_visits = 2;

    let report = run_crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(report.outcome, CrawlOutcome::Completed);
    assert_eq!(requests_for(&mock_server, "GET", "/new").await, 1);
    assert_eq!(requests_for(&mock_server, "GET", "/old").await, 1);
}

#[tokio::test]
async fn test_interrupt_returns_resolved_rows() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&["/broken", "/slow"]))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.crawler.request_timeout = 60;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), run_crawl(&config, cancel))
        .await
        .expect("Interrupted crawl did not return")
        .expect("Crawl failed");

    assert!(report.interrupted());
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].link, format!("{}/broken", base_url));
    assert_eq!(report.rows[0].link_status, 500);
    assert!(report.rows.iter().all(|row| row.fields().len() == 5));
}

#[tokio::test]
async fn test_response_cache_skips_refetch() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let cache_dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&["/missing"]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&base_url);
    config.crawler.no_cache = false;
    config.crawler.cache_dir = cache_dir.path().to_string_lossy().into_owned();

    let first = run_crawl(&config, CancellationToken::new()).await.unwrap();
    let second = run_crawl(&config, CancellationToken::new()).await.unwrap();

    assert_eq!(first.rows, second.rows);
    assert_eq!(second.rows.len(), 1);
    mock_server.verify().await;
}

#[tokio::test]
async fn test_csv_report_file() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&["/missing"]))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url);
    let report = run_crawl(&config, CancellationToken::new()).await.unwrap();

    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("report.csv");
    write_csv_file(&csv_path, &report.rows).unwrap();

    let content = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("Source Page,Link,Status,SSL Link,SSL Status")
    );
    assert_eq!(
        lines.next(),
        Some(
            format!(
                "{base}/,{base}/missing,404,{secure}/missing,",
                base = base_url,
                secure = base_url.replacen("http://", "https://", 1)
            )
            .as_str()
        )
    );
    assert_eq!(lines.next(), None);
}
