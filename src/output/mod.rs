//! Output module for run exports and reports
//!
//! This module handles:
//! - Writing the flat JSON export of each run
//! - The one-line run summary and the console report
//! - Per-collection statistics from the document store

mod json;
pub mod summary;

pub use json::{render_export, write_export};
pub use summary::{
    load_statistics, log_summary, print_run_summary, print_statistics, summary_line,
    CollectionStatistics,
};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing the export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize export: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Export is not valid UTF-8: {0}")]
    Encoding(String),
}
