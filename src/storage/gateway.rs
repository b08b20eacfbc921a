//! Persistence gateway
//!
//! Owns one store connection for the duration of a run. Connecting retries
//! the open-and-probe sequence under a [`RetryPolicy`]; once connected the
//! gateway writes batches with insert-if-absent semantics.

use crate::record::{NewsRecord, UpsertSummary};
use crate::retry::RetryPolicy;
use crate::storage::traits::{DocumentStore, StorageResult};
use crate::storage::{ConnectionError, SqliteStore, StoreLocation};
use tracing::{debug, info};

/// Connected document store plus the URI it was reached at
pub struct PersistenceGateway<S: DocumentStore = SqliteStore> {
    store: S,
    uri: String,
}

impl PersistenceGateway<SqliteStore> {
    /// Connects to a SQLite store URI, retrying per `policy`
    pub async fn connect(uri: &str, policy: &RetryPolicy) -> Result<Self, ConnectionError> {
        let location = StoreLocation::parse(uri).map_err(|e| ConnectionError {
            uri: uri.to_string(),
            attempts: 0,
            last_error: e.to_string(),
        })?;

        Self::connect_with(uri, policy, || SqliteStore::open(&location)).await
    }
}

impl<S: DocumentStore> PersistenceGateway<S> {
    /// Connects through a custom opener
    ///
    /// Each attempt calls `opener` and then probes the returned store; a
    /// failure of either consumes one attempt.
    pub async fn connect_with<O>(
        uri: &str,
        policy: &RetryPolicy,
        mut opener: O,
    ) -> Result<Self, ConnectionError>
    where
        O: FnMut() -> StorageResult<S>,
    {
        info!(uri, max_attempts = policy.max_attempts(), "Connecting to document store");

        let store = policy
            .run_probed("store-connect", |_| opener(), |store: &S| store.ping())
            .await
            .map_err(|exhausted| ConnectionError {
                uri: uri.to_string(),
                attempts: exhausted.attempts,
                last_error: exhausted.last_error.to_string(),
            })?;

        info!(uri, "Document store connected");

        Ok(Self {
            store,
            uri: uri.to_string(),
        })
    }

    /// Inserts every record whose link is not yet stored in `collection`
    ///
    /// Existing documents are left untouched. Running the same batch twice
    /// inserts nothing the second time.
    pub fn upsert_batch(
        &mut self,
        collection: &str,
        records: &[NewsRecord],
    ) -> StorageResult<UpsertSummary> {
        let mut summary = UpsertSummary::default();

        for record in records {
            if self.store.insert_if_absent(collection, record)? {
                summary.inserted += 1;
                debug!(collection, link = %record.link, "Inserted");
            } else {
                summary.skipped += 1;
                debug!(collection, link = %record.link, "Already stored, skipped");
            }
        }

        info!(
            collection,
            inserted = summary.inserted,
            skipped = summary.skipped,
            "Batch persisted"
        );

        Ok(summary)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Closes the connection
    pub fn close(self) -> StorageResult<()> {
        debug!(uri = %self.uri, "Closing document store");
        self.store.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Backoff;
    use crate::storage::{StorageError, StoredDocument};
    use chrono::{TimeZone, Utc};
    use std::cell::Cell;
    use std::time::Duration;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Backoff::Fixed(Duration::from_millis(1)))
    }

    fn batch() -> Vec<NewsRecord> {
        let scraped_at = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        vec![
            NewsRecord::new("One", "https://example.com/1", "Example", scraped_at),
            NewsRecord::new("Two", "https://example.com/2", "Example", scraped_at),
            NewsRecord::new("Three", "https://example.com/3", "Example", scraped_at),
        ]
    }

    /// Store whose liveness probe can be switched off
    struct ProbeGated {
        inner: SqliteStore,
        healthy: bool,
    }

    impl DocumentStore for ProbeGated {
        fn ping(&self) -> StorageResult<()> {
            if self.healthy {
                self.inner.ping()
            } else {
                Err(StorageError::Database("server selection timeout".to_string()))
            }
        }

        fn insert_if_absent(
            &mut self,
            collection: &str,
            record: &NewsRecord,
        ) -> StorageResult<bool> {
            self.inner.insert_if_absent(collection, record)
        }

        fn find_by_link(
            &self,
            collection: &str,
            link: &str,
        ) -> StorageResult<Option<StoredDocument>> {
            self.inner.find_by_link(collection, link)
        }

        fn count(&self, collection: &str) -> StorageResult<u64> {
            self.inner.count(collection)
        }

        fn collections(&self) -> StorageResult<Vec<(String, u64)>> {
            self.inner.collections()
        }
    }

    #[tokio::test]
    async fn test_upsert_batch_is_idempotent() {
        let mut gateway = PersistenceGateway::connect("sqlite::memory:", &policy(1))
            .await
            .unwrap();
        let records = batch();

        let first = gateway.upsert_batch("news", &records).unwrap();
        assert_eq!(first, UpsertSummary { inserted: 3, skipped: 0 });

        let second = gateway.upsert_batch("news", &records).unwrap();
        assert_eq!(second, UpsertSummary { inserted: 0, skipped: 3 });

        assert_eq!(gateway.store().count("news").unwrap(), 3);
        gateway.close().unwrap();
    }

    #[tokio::test]
    async fn test_connect_attempts_exactly_retries_then_fails() {
        let opens = Cell::new(0u32);
        let result = PersistenceGateway::connect_with("sqlite::memory:", &policy(3), || {
            opens.set(opens.get() + 1);
            Ok(ProbeGated {
                inner: SqliteStore::open_in_memory()?,
                healthy: false,
            })
        })
        .await;

        let error = match result {
            Err(e) => e,
            Ok(_) => panic!("connection should have failed"),
        };
        assert_eq!(opens.get(), 3);
        assert_eq!(error.attempts, 3);
        assert!(error.last_error.contains("server selection timeout"));
    }

    #[tokio::test]
    async fn test_connect_succeeds_on_final_attempt() {
        let opens = Cell::new(0u32);
        let mut gateway = PersistenceGateway::connect_with("sqlite::memory:", &policy(3), || {
            opens.set(opens.get() + 1);
            Ok(ProbeGated {
                inner: SqliteStore::open_in_memory()?,
                healthy: opens.get() == 3,
            })
        })
        .await
        .unwrap();

        assert_eq!(opens.get(), 3);
        let summary = gateway.upsert_batch("news", &batch()).unwrap();
        assert_eq!(summary.inserted, 3);
    }

    #[tokio::test]
    async fn test_open_failure_consumes_attempts() {
        let result = PersistenceGateway::<SqliteStore>::connect_with("sqlite://x", &policy(2), || {
            Err(StorageError::Database("connection refused".to_string()))
        })
        .await;

        match result {
            Err(e) => assert_eq!(e.attempts, 2),
            Ok(_) => panic!("connection should have failed"),
        }
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_uri() {
        let result = PersistenceGateway::connect("postgres://db", &policy(3)).await;
        assert!(result.is_err());
    }
}
