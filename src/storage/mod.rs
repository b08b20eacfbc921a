//! Storage module for persisting news records
//!
//! This module handles all document store operations:
//! - Store URI parsing and SQLite initialization
//! - Insert-if-absent writes keyed on `(collection, link)`
//! - Connection establishment with bounded retry and a liveness probe
//! - Per-collection counts for the stats view

mod gateway;
mod schema;
mod sqlite;
mod traits;

pub use gateway::PersistenceGateway;
pub use sqlite::SqliteStore;
pub use traits::{DocumentStore, StorageError, StorageResult};

use crate::record::NewsRecord;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

const MEMORY_URI: &str = "sqlite::memory:";
const FILE_PREFIX: &str = "sqlite://";

/// Where a store lives, parsed from its URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// `sqlite://<path>`
    File(PathBuf),
    /// `sqlite::memory:`
    Memory,
}

impl StoreLocation {
    /// Parses a store URI
    ///
    /// # Example
    ///
    /// ```
    /// use cyber_news_scraper::storage::StoreLocation;
    ///
    /// assert_eq!(StoreLocation::parse("sqlite::memory:").unwrap(), StoreLocation::Memory);
    /// assert!(StoreLocation::parse("mongodb://localhost:27017/").is_err());
    /// ```
    pub fn parse(uri: &str) -> Result<Self, StorageError> {
        let uri = uri.trim();

        if uri == MEMORY_URI {
            return Ok(Self::Memory);
        }

        match uri.strip_prefix(FILE_PREFIX) {
            Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
            Some(_) => Err(StorageError::InvalidUri(format!(
                "'{}' names no database file",
                uri
            ))),
            None => Err(StorageError::InvalidUri(format!(
                "'{}' is neither {}<path> nor {}",
                uri, FILE_PREFIX, MEMORY_URI
            ))),
        }
    }
}

impl fmt::Display for StoreLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}{}", FILE_PREFIX, path.display()),
            Self::Memory => f.write_str(MEMORY_URI),
        }
    }
}

/// The store could not be reached within the retry bound
#[derive(Debug, Error)]
#[error("Failed to connect to document store at {uri} after {attempts} attempts: {last_error}")]
pub struct ConnectionError {
    pub uri: String,
    pub attempts: u32,
    pub last_error: String,
}

/// A record as held by the store
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: i64,
    pub collection: String,
    pub record: NewsRecord,
    /// RFC 3339 time of the first (and only) write
    pub inserted_at: String,
}
