use crate::config::types::{
    Config, FetchMode, HttpConfig, RenderOptions, SelectorConfig, SiteConfig, StorageConfig,
};
use crate::normalize::{lookup_offset, resolve_base};
use crate::pipeline::CompiledSelectors;
use crate::storage::StoreLocation;
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;
    validate_storage_config(&config.storage)?;

    if config.sites.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[site]] must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for site in &config.sites {
        if !names.insert(site.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site name '{}'",
                site.name
            )));
        }
        validate_site(site)?;
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "http timeouts must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    StoreLocation::parse(&config.uri)
        .map_err(|e| ConfigError::Validation(format!("invalid storage uri: {}", e)))?;

    if config.retries < 1 {
        return Err(ConfigError::Validation(format!(
            "storage retries must be >= 1, got {}",
            config.retries
        )));
    }

    Ok(())
}

/// Validates one site descriptor
pub fn validate_site(site: &SiteConfig) -> Result<(), ConfigError> {
    if site.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    if site.source.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "site '{}' must declare a source",
            site.name
        )));
    }

    let url = Url::parse(&site.url)
        .map_err(|e| ConfigError::InvalidUrl(format!("site '{}' url: {}", site.name, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "site '{}' url must use http or https, got '{}'",
            site.name,
            url.scheme()
        )));
    }

    resolve_base(site)?;

    validate_collection_name(&site.collection)?;

    if site.fetch_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "site '{}' fetch-attempts must be >= 1",
            site.name
        )));
    }

    if let Some(tz) = &site.timezone {
        if lookup_offset(tz).is_none() {
            return Err(ConfigError::Validation(format!(
                "site '{}' has unknown timezone '{}'",
                site.name, tz
            )));
        }
    }

    if let FetchMode::Rendered(options) = &site.fetch {
        validate_render_options(&site.name, options)?;
    }

    validate_selectors(&site.selectors)?;

    if let Some(pattern) = &site.dates.pattern {
        Regex::new(pattern).map_err(|e| {
            ConfigError::Validation(format!(
                "site '{}' date pattern does not compile: {}",
                site.name, e
            ))
        })?;
    }

    if let Some(separator) = &site.dates.author_separator {
        if separator.is_empty() {
            return Err(ConfigError::Validation(format!(
                "site '{}' author-separator cannot be empty",
                site.name
            )));
        }
    }

    Ok(())
}

fn validate_render_options(site: &str, options: &RenderOptions) -> Result<(), ConfigError> {
    scraper::Selector::parse(&options.wait_selector).map_err(|e| {
        ConfigError::InvalidSelector(format!(
            "site '{}' wait-selector '{}': {}",
            site, options.wait_selector, e
        ))
    })?;

    if options.navigation_timeout_secs == 0 || options.wait_timeout_secs == 0 {
        return Err(ConfigError::Validation(format!(
            "site '{}' browser timeouts must be greater than zero",
            site
        )));
    }

    Ok(())
}

fn validate_selectors(selectors: &SelectorConfig) -> Result<(), ConfigError> {
    if selectors.link_attr.trim().is_empty() {
        return Err(ConfigError::Validation(
            "link-attr cannot be empty".to_string(),
        ));
    }
    CompiledSelectors::compile(selectors).map(|_| ())
}

/// Collections become store keys; keep them to a conservative alphabet
fn validate_collection_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "collection cannot be empty".to_string(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "collection '{}' must contain only ASCII letters, digits, '_' or '-'",
            name
        )));
    }

    Ok(())
}
