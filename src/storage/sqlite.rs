//! SQLite document store
//!
//! This module provides a SQLite-based implementation of the DocumentStore trait.

use crate::record::NewsRecord;
use crate::storage::schema::{initialize_schema, schema_present};
use crate::storage::traits::{DocumentStore, StorageError, StorageResult};
use crate::storage::{StoreLocation, StoredDocument};
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::time::Duration;

/// SQLite document store backend
pub struct SqliteStore {
    conn: Connection,
    location: StoreLocation,
}

impl SqliteStore {
    /// Opens (creating if needed) the store at `location`
    pub fn open(location: &StoreLocation) -> StorageResult<Self> {
        let conn = match location {
            StoreLocation::File(path) => {
                let conn = Connection::open(path)?;
                conn.execute_batch(
                    "
                    PRAGMA journal_mode = WAL;
                    PRAGMA synchronous = NORMAL;
                    PRAGMA temp_store = MEMORY;
                ",
                )?;
                conn
            }
            StoreLocation::Memory => Connection::open_in_memory()?,
        };

        // Concurrent writers on the same file wait instead of failing
        conn.busy_timeout(Duration::from_secs(5))?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            location: location.clone(),
        })
    }

    /// Creates an in-memory store
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open(&StoreLocation::Memory)
    }

    /// Opens an existing store without creating or migrating anything
    pub fn open_read_only(location: &StoreLocation) -> StorageResult<Self> {
        let conn = match location {
            StoreLocation::File(path) => {
                if !path.is_file() {
                    return Err(StorageError::NotFound(location.to_string()));
                }
                Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?
            }
            StoreLocation::Memory => return Self::open(location),
        };

        if !schema_present(&conn)? {
            return Err(StorageError::SchemaMissing(format!(
                "documents table not found in {}",
                location
            )));
        }

        Ok(Self {
            conn,
            location: location.clone(),
        })
    }
}

impl DocumentStore for SqliteStore {
    fn ping(&self) -> StorageResult<()> {
        let one: i64 = self.conn.query_row("SELECT 1", [], |row| row.get(0))?;
        if one != 1 {
            return Err(StorageError::Database(format!(
                "liveness probe returned {}",
                one
            )));
        }

        if !schema_present(&self.conn)? {
            return Err(StorageError::SchemaMissing(format!(
                "documents table not found in {}",
                self.location
            )));
        }

        Ok(())
    }

    fn insert_if_absent(&mut self, collection: &str, record: &NewsRecord) -> StorageResult<bool> {
        let body = serde_json::to_string(record)?;
        let now = Utc::now().to_rfc3339();

        let changed = self.conn.execute(
            "INSERT INTO documents (collection, link, title, source, body, inserted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(collection, link) DO NOTHING",
            params![collection, record.link, record.title, record.source, body, now],
        )?;

        Ok(changed == 1)
    }

    fn find_by_link(&self, collection: &str, link: &str) -> StorageResult<Option<StoredDocument>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, collection, body, inserted_at FROM documents
                 WHERE collection = ?1 AND link = ?2",
                params![collection, link],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, collection, body, inserted_at)) => Ok(Some(StoredDocument {
                id,
                collection,
                record: serde_json::from_str(&body)?,
                inserted_at,
            })),
            None => Ok(None),
        }
    }

    fn count(&self, collection: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn collections(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection, COUNT(*) FROM documents GROUP BY collection ORDER BY collection",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut collections = Vec::new();
        for row in rows {
            collections.push(row?);
        }
        Ok(collections)
    }

    fn close(self) -> StorageResult<()> {
        self.conn.close().map_err(|(_, e)| StorageError::Sqlite(e))
    }
}
