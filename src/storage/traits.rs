//! Storage traits and error types
//!
//! This module defines the trait interface for document store backends and
//! associated error types.

use crate::record::NewsRecord;
use crate::storage::StoredDocument;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid store URI: {0}")]
    InvalidUri(String),

    #[error("Store not found: {0}")]
    NotFound(String),

    #[error("Schema missing: {0}")]
    SchemaMissing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A document store keyed on `(collection, link)`
///
/// Writes are insert-if-absent: the first record stored for a link wins and
/// later ones are skipped, never merged.
pub trait DocumentStore {
    /// Liveness probe; fails if the store cannot serve requests
    fn ping(&self) -> StorageResult<()>;

    /// Inserts the record unless its link is already stored
    ///
    /// # Returns
    ///
    /// `true` if a new document was written, `false` if the link existed
    fn insert_if_absent(&mut self, collection: &str, record: &NewsRecord) -> StorageResult<bool>;

    /// Looks up the stored document for a link
    fn find_by_link(&self, collection: &str, link: &str) -> StorageResult<Option<StoredDocument>>;

    /// Counts documents in one collection
    fn count(&self, collection: &str) -> StorageResult<u64>;

    /// Lists every collection with its document count, sorted by name
    fn collections(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Releases the underlying connection
    fn close(self) -> StorageResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}
