use crate::config::types::{Config, STORE_URI_ENV};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use cyber_news_scraper::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("{} sites configured", config.sites.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let store_uri = std::env::var(STORE_URI_ENV).ok();
    parse_config_with_store_uri(&content, store_uri.as_deref())
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    parse_config_with_store_uri(content, None)
}

/// Parses configuration, replacing `[storage] uri` with `store_uri` when it
/// is set and non-blank
///
/// The override is validated like any configured URI.
pub fn parse_config_with_store_uri(
    content: &str,
    store_uri: Option<&str>,
) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(content)?;

    if let Some(uri) = store_uri.map(str::trim).filter(|uri| !uri.is_empty()) {
        tracing::info!("Store URI taken from {}", STORE_URI_ENV);
        config.storage.uri = uri.to_string();
    }

    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so that a run can be tied to the exact selector set it
/// used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{BackoffKind, FetchMode, DEFAULT_STORAGE_URI};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[storage]
uri = "sqlite::memory:"
retries = 5
retry-delay-ms = 100
backoff = "linear"

[[site]]
name = "cyware"
source = "Cyware"
url = "https://cyware.com/search?search=india"
collection = "cyware_news"
export-path = "cyware_news.json"

[site.fetch]
mode = "rendered"
wait-selector = ".cy-panel.cy-card.mb-4"
navigation-timeout-secs = 60

[site.selectors]
container = "div.cy-panel"
title = "div.cy-card__title"
summary = "div.cy-card__description"
link = "a"
meta = "div.cy-card__meta"

[[site]]
name = "toi"
source = "Times of India"
url = "https://timesofindia.indiatimes.com/topic/cyber-security/news"
collection = "toi_news"
timezone = "IST"

[site.fetch]
mode = "static"

[site.selectors]
container = "div.uwU81"
title = "div.fHv_i"
link = "a"
date = "div.ZxBIG"

[site.dates]
author-separator = "/"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.storage.retries, 5);
        assert_eq!(config.storage.backoff, BackoffKind::Linear);

        let cyware = config.site("cyware").unwrap();
        match &cyware.fetch {
            FetchMode::Rendered(options) => {
                assert_eq!(options.wait_selector, ".cy-panel.cy-card.mb-4");
                assert_eq!(options.navigation_timeout_secs, 60);
                assert_eq!(options.wait_timeout_secs, 30);
            }
            FetchMode::Static => panic!("cyware should be rendered"),
        }
        assert_eq!(cyware.selectors.link_attr, "href");
        assert_eq!(cyware.fetch_attempts, 1);

        let toi = config.site("toi").unwrap();
        assert_eq!(toi.fetch, FetchMode::Static);
        assert_eq!(toi.dates.author_separator.as_deref(), Some("/"));
    }

    #[test]
    fn test_defaults_applied() {
        let content = r#"
[[site]]
name = "certin"
source = "CERT-In"
url = "https://www.cert-in.org.in/s2cMainServlet?pageid=PUBVLNOTES01"
collection = "cert_in_news"

[site.fetch]
mode = "static"

[site.selectors]
container = "table.table tbody tr"
title = "td:nth-child(2)"
link = "td:nth-child(2) a"
date = "td:nth-child(3)"
"#;
        let config = parse_config(content).unwrap();
        assert_eq!(config.storage.uri, DEFAULT_STORAGE_URI);
        assert_eq!(config.storage.retries, 3);
        assert_eq!(config.storage.retry_delay_ms, 2000);
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.http.user_agent.starts_with("Mozilla/5.0"));
    }

    const MINIMAL_CONFIG: &str = r#"
[storage]
uri = "sqlite://from_file.db"

[[site]]
name = "i4c"
source = "I4C"
url = "https://i4c.mha.gov.in/"
collection = "i4c_news"

[site.fetch]
mode = "static"

[site.selectors]
container = "div.news-item"
title = "h3"
link = "a"
"#;

    #[test]
    fn test_store_uri_override_replaces_file_value() {
        let config =
            parse_config_with_store_uri(MINIMAL_CONFIG, Some("sqlite:///var/lib/news.db")).unwrap();
        assert_eq!(config.storage.uri, "sqlite:///var/lib/news.db");
    }

    #[test]
    fn test_blank_store_uri_override_ignored() {
        let config = parse_config_with_store_uri(MINIMAL_CONFIG, Some("  ")).unwrap();
        assert_eq!(config.storage.uri, "sqlite://from_file.db");

        let config = parse_config_with_store_uri(MINIMAL_CONFIG, None).unwrap();
        assert_eq!(config.storage.uri, "sqlite://from_file.db");
    }

    #[test]
    fn test_store_uri_override_is_validated() {
        let result =
            parse_config_with_store_uri(MINIMAL_CONFIG, Some("mongodb://localhost:27017/"));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_fetch_mode_rejected() {
        let content = VALID_CONFIG.replace("mode = \"static\"", "mode = \"carrier-pigeon\"");
        assert!(matches!(parse_config(&content), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let content = VALID_CONFIG.replace("retries = 5", "retries = 0");
        let file = create_temp_config(&content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_load_config_with_hash() {
        let file = create_temp_config(VALID_CONFIG);
        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.sites.len(), 2);
        assert_eq!(hash.len(), 64);
    }
}
