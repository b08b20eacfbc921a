//! Run summaries and store statistics
//!
//! This module renders a [`RunResult`] as a single log line and as a console
//! report, and gathers per-collection document counts for `--stats`.

use crate::record::RunResult;
use crate::storage::{DocumentStore, StorageError};

/// Per-collection document counts
#[derive(Debug, Clone, Default)]
pub struct CollectionStatistics {
    /// `(collection, documents)` sorted by collection name
    pub collections: Vec<(String, u64)>,

    /// Documents across all collections
    pub total_documents: u64,
}

/// Loads statistics from a store
pub fn load_statistics(store: &dyn DocumentStore) -> Result<CollectionStatistics, StorageError> {
    let collections = store.collections()?;
    let total_documents = collections.iter().map(|(_, count)| count).sum();

    Ok(CollectionStatistics {
        collections,
        total_documents,
    })
}

/// One-line run summary
pub fn summary_line(result: &RunResult) -> String {
    format!(
        "{}: fetched {} page(s), {} entries, {} records, {} saved, {} skipped, {} warnings in {:.2}s",
        result.source,
        result.fetched_count,
        result.extracted_count,
        result.record_count,
        result.saved_count,
        result.skipped_count,
        result.warnings.len(),
        result.duration.as_secs_f64()
    )
}

/// Emits the summary line through tracing
pub fn log_summary(result: &RunResult) {
    tracing::info!(
        source = %result.source,
        fetched = result.fetched_count,
        extracted = result.extracted_count,
        records = result.record_count,
        saved = result.saved_count,
        skipped = result.skipped_count,
        warnings = result.warnings.len(),
        duration_ms = result.duration.as_millis() as u64,
        "{}",
        summary_line(result)
    );
}

/// Prints a run report to stdout
pub fn print_run_summary(result: &RunResult) {
    println!("=== {} ===\n", result.source);

    println!("Overview:");
    println!("  Pages fetched: {}", result.fetched_count);
    println!("  Entries processed: {}", result.extracted_count);
    println!("  Valid records: {}", result.record_count);
    println!("  Newly saved: {}", result.saved_count);
    println!("  Already stored: {}", result.skipped_count);
    println!("  Duration: {:.2}s", result.duration.as_secs_f64());
    if let Some(path) = &result.export_path {
        println!("  Export: {}", path.display());
    }
    println!();

    if !result.errors.is_empty() {
        println!("Warnings ({}):", result.errors.len());
        for error in &result.errors {
            println!("  - {}", error);
        }
        println!();
    }

    for record in result.records.iter().take(10) {
        let date = record
            .date
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_default();
        println!("  [{}] {}", date, record.title);
        println!("      {}", record.link);
    }
    if result.records.len() > 10 {
        println!("  ... and {} more", result.records.len() - 10);
    }
}

/// Prints store statistics to stdout
pub fn print_statistics(stats: &CollectionStatistics) {
    println!("=== Document Store Statistics ===\n");

    if stats.collections.is_empty() {
        println!("No documents stored yet.");
        return;
    }

    println!("Collections:");
    for (collection, count) in &stats.collections {
        let percentage = if stats.total_documents > 0 {
            (*count as f64 / stats.total_documents as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", collection, count, percentage);
    }
    println!();
    println!("Total documents: {}", stats.total_documents);
}
