//! Configuration module
//!
//! Loads, parses and validates the TOML file that describes the HTTP client,
//! the document store and every scraped site. Sites are plain data: a fetch
//! mode, a selector set and date hints.
//!
//! # Example
//!
//! ```no_run
//! use cyber_news_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! let site = config.site("cyware").unwrap();
//! println!("{} is fetched in {} mode", site.source, site.fetch.label());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BackoffKind, Config, DateConfig, FetchMode, HttpConfig, RenderOptions, SelectorConfig,
    SiteConfig, StorageConfig, DEFAULT_STORAGE_URI, DEFAULT_USER_AGENT, STORE_URI_ENV,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_config,
    parse_config_with_store_uri,
};
pub use validation::validate_site;
