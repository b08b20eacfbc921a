//! Cyber-news scraper: a configuration-driven extraction-and-upsert pipeline
//!
//! This crate fetches a cybersecurity news or advisory listing (plain HTTP or a
//! headless-browser render), extracts one record per listing entry, normalizes
//! links and dates, writes a flat JSON export and inserts new records into a
//! document store keyed on the article link.

pub mod config;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod retry;
pub mod storage;

use thiserror::Error;

/// Main error type for scraper runs
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] pipeline::FetchError),

    #[error("{0}")]
    Connection(#[from] storage::ConnectionError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Export error: {0}")]
    Export(#[from] output::ExportError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScraperError {
    /// Process exit code for this failure
    ///
    /// Fetch and persistence failures are kept distinct so that callers can
    /// tell "the site could not be read" from "the store could not be reached".
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Url(_) => 1,
            Self::Fetch(_) => 2,
            Self::Connection(_) | Self::Storage(_) => 3,
            Self::Export(_) | Self::Io(_) => 4,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Unknown site: {0}")]
    UnknownSite(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Empty link")]
    Empty,

    #[error("Unsupported link target: {0}")]
    Unsupported(String),
}

/// Result type alias for scraper operations
pub type Result<T> = std::result::Result<T, ScraperError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Truncates a diagnostic message to at most `max` characters
///
/// Appends `...` when something was cut, matching how per-record and
/// per-stage failures are reported in the run summary.
pub fn truncate_diagnostic(message: &str, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &message[..cut]),
        None => message.to_string(),
    }
}

// Re-export commonly used types
pub use config::{Config, SiteConfig};
pub use pipeline::{Extractor, FetchError, PageFetcher, RunController};
pub use record::{NewsDate, NewsRecord, RunResult};
pub use storage::{DocumentStore, PersistenceGateway, SqliteStore};
