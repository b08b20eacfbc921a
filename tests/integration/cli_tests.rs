//! Command-line behavior: listing, dry runs and exit codes

use std::io::Write;
use std::process::Command;
use tempfile::NamedTempFile;

const CONFIG: &str = r#"
[storage]
uri = "sqlite::memory:"
retries = 1
retry-delay-ms = 1

[[site]]
name = "i4c"
source = "I4C"
url = "http://127.0.0.1:9/"
collection = "i4c_news"

[site.fetch]
mode = "static"

[site.selectors]
container = "div.news-item"
title = "h3"
link = "a"
date = "span.date"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn scraper() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cyber-news-scraper"))
}

#[test]
fn test_list_sites() {
    let config = write_config(CONFIG);
    let output = scraper()
        .arg(config.path())
        .arg("--list-sites")
        .arg("-q")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("i4c"));
    assert!(stdout.contains("i4c_news"));
}

#[test]
fn test_dry_run_validates() {
    let config = write_config(CONFIG);
    let output = scraper()
        .arg(config.path())
        .arg("--dry-run")
        .arg("-q")
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Configuration is valid"));
}

#[test]
fn test_invalid_config_exits_with_config_code() {
    let config = write_config("[[site]]\nname = \"broken\"\n");
    let output = scraper().arg(config.path()).arg("-q").output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_unknown_site_exits_with_config_code() {
    let config = write_config(CONFIG);
    let output = scraper()
        .arg(config.path())
        .args(["--site", "nope", "-q"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_unreachable_site_exits_with_fetch_code() {
    let config = write_config(CONFIG);
    let output = scraper()
        .arg(config.path())
        .args(["--site", "i4c", "--no-store", "-q"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_store_uri_from_environment_is_validated() {
    let config = write_config(CONFIG);
    let output = scraper()
        .arg(config.path())
        .arg("--list-sites")
        .arg("-q")
        .env("CYBER_NEWS_STORE_URI", "mongodb://localhost:27017/")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_store_uri_from_environment_shown_in_dry_run() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("env.db");
    let config = write_config(CONFIG);

    let output = scraper()
        .arg(config.path())
        .args(["--dry-run", "-q"])
        .env("CYBER_NEWS_STORE_URI", format!("sqlite://{}", db.display()))
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("env.db"));
}

#[test]
fn test_stats_does_not_create_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("never.db");
    let config = write_config(CONFIG);

    let output = scraper()
        .arg(config.path())
        .args(["--stats", "-q"])
        .env("CYBER_NEWS_STORE_URI", format!("sqlite://{}", db.display()))
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No documents stored yet"));
    assert!(!db.exists());
}
