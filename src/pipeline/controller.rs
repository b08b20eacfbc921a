//! Run controller - one site, one run
//!
//! This module sequences a run end to end:
//! - Fetching the listing page (optionally retried)
//! - Extracting and normalizing records
//! - Writing the flat export
//! - Persisting new records through the gateway
//! - Logging the run summary

use crate::config::{SiteConfig, StorageConfig};
use crate::normalize::Normalizer;
use crate::output::{log_summary, write_export};
use crate::pipeline::extractor::Extractor;
use crate::pipeline::fetcher::PageFetcher;
use crate::record::{NewsRecord, RunResult};
use crate::retry::RetryPolicy;
use crate::storage::{
    DocumentStore, PersistenceGateway, SqliteStore, StorageResult, StoreLocation,
};
use crate::{truncate_diagnostic, ConfigError, ScraperError, UrlError};
use std::path::PathBuf;
use std::time::Instant;
use url::Url;

/// Maximum length of a stage failure diagnostic
pub const RUN_DIAGNOSTIC_LIMIT: usize = 100;

/// Drives the pipeline for one site
pub struct RunController {
    site: SiteConfig,
    storage: StorageConfig,
    extractor: Extractor,
    normalizer: Normalizer,
    export_path: Option<PathBuf>,
    persist: bool,
}

impl RunController {
    /// Creates a controller for a validated site
    pub fn new(site: SiteConfig, storage: StorageConfig) -> Result<Self, ConfigError> {
        let extractor = Extractor::new(&site)?;
        let normalizer = Normalizer::new(&site)?;
        let export_path = site.export_path.as_ref().map(PathBuf::from);

        Ok(Self {
            site,
            storage,
            extractor,
            normalizer,
            export_path,
            persist: true,
        })
    }

    /// Overrides the site's export path
    pub fn with_export_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_path = Some(path.into());
        self
    }

    /// Skips the document store; the export is still written
    pub fn without_store(mut self) -> Self {
        self.persist = false;
        self
    }

    /// Runs against the configured SQLite store
    pub async fn run(&self, fetcher: &dyn PageFetcher) -> Result<RunResult, ScraperError> {
        let location = StoreLocation::parse(&self.storage.uri)?;
        self.run_with(fetcher, move || SqliteStore::open(&location)).await
    }

    /// Runs with a custom store opener
    ///
    /// The opener is only called if persistence is enabled, once per
    /// connection attempt.
    pub async fn run_with<S, O>(
        &self,
        fetcher: &dyn PageFetcher,
        opener: O,
    ) -> Result<RunResult, ScraperError>
    where
        S: DocumentStore,
        O: FnMut() -> StorageResult<S>,
    {
        let started = Instant::now();
        let mut result = RunResult {
            source: self.site.source.clone(),
            ..RunResult::default()
        };

        tracing::info!(
            site = %self.site.name,
            url = %self.site.url,
            mode = fetcher.mode(),
            "Starting run"
        );

        // Fetch
        let target = Url::parse(&self.site.url).map_err(|e| UrlError::Parse(e.to_string()))?;
        let fetch_policy =
            RetryPolicy::from_storage(&self.storage).with_max_attempts(self.site.fetch_attempts);
        let document = match fetch_policy.run("fetch", |_| fetcher.fetch(&target)).await {
            Ok(document) => document,
            Err(exhausted) => {
                let error = exhausted.last_error;
                tracing::error!(
                    site = %self.site.name,
                    attempts = exhausted.attempts,
                    "Fetch failed: {}",
                    truncate_diagnostic(&error.to_string(), RUN_DIAGNOSTIC_LIMIT)
                );
                return Err(error.into());
            }
        };
        result.fetched_count = 1;

        // Extract
        let batch = self.extractor.extract_page(&document.body);
        drop(document);

        result.extracted_count = batch.processed;
        for warning in batch.warnings {
            tracing::warn!(site = %self.site.name, "Skipped {}", warning);
            result.push_warning(warning);
        }

        // Normalize
        let records: Vec<NewsRecord> = batch
            .records
            .into_iter()
            .map(|record| self.normalizer.normalize(record))
            .collect();
        result.record_count = records.len();
        tracing::info!(
            records = result.record_count,
            warnings = result.warnings.len(),
            "Extraction complete"
        );

        // Export
        if let Some(path) = &self.export_path {
            if let Err(e) = write_export(path, &records) {
                result.records = records;
                result.duration = started.elapsed();
                log_summary(&result);
                tracing::error!(
                    "Export failed: {}",
                    truncate_diagnostic(&e.to_string(), RUN_DIAGNOSTIC_LIMIT)
                );
                return Err(e.into());
            }
            result.export_path = Some(path.clone());
        }

        // Persist
        if self.persist {
            let persisted = self.persist_batch(&records, opener, &mut result).await;
            if let Err(e) = persisted {
                result.records = records;
                result.duration = started.elapsed();
                log_summary(&result);
                tracing::error!(
                    collection = %self.site.collection,
                    "Persistence failed: {}",
                    truncate_diagnostic(&e.to_string(), RUN_DIAGNOSTIC_LIMIT)
                );
                return Err(e);
            }
        } else {
            tracing::info!("Persistence disabled, records kept in export only");
        }

        result.records = records;
        result.duration = started.elapsed();
        log_summary(&result);

        Ok(result)
    }

    async fn persist_batch<S, O>(
        &self,
        records: &[NewsRecord],
        opener: O,
        result: &mut RunResult,
    ) -> Result<(), ScraperError>
    where
        S: DocumentStore,
        O: FnMut() -> StorageResult<S>,
    {
        let policy = RetryPolicy::from_storage(&self.storage);
        let mut gateway =
            PersistenceGateway::connect_with(&self.storage.uri, &policy, opener).await?;

        let summary = gateway.upsert_batch(&self.site.collection, records)?;
        result.saved_count = summary.inserted;
        result.skipped_count = summary.skipped;

        if let Err(e) = gateway.close() {
            tracing::warn!(error = %e, "Closing document store failed");
        }

        Ok(())
    }
}
