use cyber_news_scraper::config::parse_config;
use cyber_news_scraper::pipeline::{fetcher_for, RunController};
use cyber_news_scraper::storage::{DocumentStore, SqliteStore, StoreLocation};
use cyber_news_scraper::{NewsDate, NewsRecord, ScraperError};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Two listing entries: one complete, one missing its link
const LISTING: &str = r#"<html><head><title>Alerts</title></head><body>
  <div class="news-item">
    <h3>CERT advisory: critical VPN flaw</h3>
    <p class="summary">Patch   immediately.</p>
    <a href="/alerts/vpn-flaw">Details</a>
    <span class="meta">Desk / 15 March, 2024 (IST)</span>
  </div>
  <div class="news-item">
    <h3>Entry without a link</h3>
    <span class="meta">Desk / 16 March, 2024</span>
  </div>
</body></html>"#;

/// Builds a single-site config pointing at the mock server
fn config_toml(server_uri: &str, db_path: &str, export_path: &str) -> String {
    format!(
        r#"
[storage]
uri = "sqlite://{db}"
retries = 2
retry-delay-ms = 10

[[site]]
name = "alerts"
source = "Mock Alerts"
url = "{uri}/alerts"
collection = "alerts_news"
export-path = "{export}"
timezone = "UTC"

[site.fetch]
mode = "static"

[site.selectors]
container = "div.news-item"
title = "h3"
summary = "p.summary"
link = "a"
date = "span.meta"

[site.dates]
author-separator = "/"
"#,
        db = db_path,
        uri = server_uri,
        export = export_path
    )
}

async fn mount_listing(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_run() {
    let server = MockServer::start().await;
    mount_listing(&server, LISTING).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("news.db");
    let export_path = dir.path().join("alerts.json");
    let config = parse_config(&config_toml(
        &server.uri(),
        db_path.to_str().unwrap(),
        export_path.to_str().unwrap(),
    ))
    .unwrap();

    let site = config.site("alerts").unwrap();
    let fetcher = fetcher_for(site, &config.http).unwrap();
    let controller = RunController::new(site.clone(), config.storage.clone()).unwrap();

    let result = controller.run(fetcher.as_ref()).await.unwrap();

    assert_eq!(result.fetched_count, 1);
    assert_eq!(result.extracted_count, 2);
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.saved_count, 1);
    assert_eq!(result.skipped_count, 0);

    // Export holds exactly the one valid record
    let content = std::fs::read_to_string(&export_path).unwrap();
    let exported: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
    assert_eq!(exported.len(), 1);
    assert!(exported[0].is_object());
    assert!(content.contains("\n    {\n        \"title\""));

    let record: NewsRecord = serde_json::from_value(exported[0].clone()).unwrap();
    assert_eq!(record.title, "CERT advisory: critical VPN flaw");
    assert_eq!(record.link, format!("{}/alerts/vpn-flaw", server.uri()));
    assert_eq!(record.summary.as_deref(), Some("Patch immediately."));
    assert_eq!(record.author.as_deref(), Some("Desk"));
    assert_eq!(record.source, "Mock Alerts");
    let expected = chrono::DateTime::parse_from_rfc3339("2024-03-15T00:00:00+05:30").unwrap();
    assert_eq!(record.date, Some(NewsDate::Parsed(expected)));

    // Store holds the same record
    let location = StoreLocation::File(db_path.clone());
    let store = SqliteStore::open(&location).unwrap();
    assert_eq!(store.count("alerts_news").unwrap(), 1);
    let stored = store
        .find_by_link("alerts_news", &record.link)
        .unwrap()
        .unwrap();
    assert_eq!(stored.record, record);
}

#[tokio::test]
async fn test_rerun_inserts_nothing_new() {
    let server = MockServer::start().await;
    mount_listing(&server, LISTING).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("news.db");
    let export_path = dir.path().join("alerts.json");
    let config = parse_config(&config_toml(
        &server.uri(),
        db_path.to_str().unwrap(),
        export_path.to_str().unwrap(),
    ))
    .unwrap();

    let site = config.site("alerts").unwrap();
    let fetcher = fetcher_for(site, &config.http).unwrap();
    let controller = RunController::new(site.clone(), config.storage.clone()).unwrap();

    let first = controller.run(fetcher.as_ref()).await.unwrap();
    let second = controller.run(fetcher.as_ref()).await.unwrap();

    assert_eq!(first.saved_count, 1);
    assert_eq!(second.saved_count, 0);
    assert_eq!(second.skipped_count, 1);

    let store = SqliteStore::open(&StoreLocation::File(db_path)).unwrap();
    assert_eq!(store.count("alerts_news").unwrap(), 1);
}

#[tokio::test]
async fn test_server_error_fails_run_without_export() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("news.db");
    let export_path = dir.path().join("alerts.json");
    let config = parse_config(&config_toml(
        &server.uri(),
        db_path.to_str().unwrap(),
        export_path.to_str().unwrap(),
    ))
    .unwrap();

    let site = config.site("alerts").unwrap();
    let fetcher = fetcher_for(site, &config.http).unwrap();
    let controller = RunController::new(site.clone(), config.storage.clone()).unwrap();

    let error = controller.run(fetcher.as_ref()).await.unwrap_err();
    assert!(matches!(error, ScraperError::Fetch(_)));
    assert_eq!(error.exit_code(), 2);
    assert!(!export_path.exists());
}

#[tokio::test]
async fn test_no_store_run_writes_export_only() {
    let server = MockServer::start().await;
    mount_listing(&server, LISTING).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("news.db");
    let export_path = dir.path().join("alerts.json");
    let override_path = dir.path().join("override.json");
    let config = parse_config(&config_toml(
        &server.uri(),
        db_path.to_str().unwrap(),
        export_path.to_str().unwrap(),
    ))
    .unwrap();

    let site = config.site("alerts").unwrap();
    let fetcher = fetcher_for(site, &config.http).unwrap();
    let controller = RunController::new(site.clone(), config.storage.clone())
        .unwrap()
        .without_store()
        .with_export_path(&override_path);

    let result = controller.run(fetcher.as_ref()).await.unwrap();

    assert_eq!(result.record_count, 1);
    assert_eq!(result.saved_count, 0);
    assert!(override_path.exists());
    assert!(!export_path.exists());
    assert!(!db_path.exists());
}
