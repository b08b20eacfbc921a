//! Flat JSON export of a run's records

use crate::output::ExportError;
use crate::record::NewsRecord;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const INDENT: &[u8] = b"    ";

/// Renders records as a JSON array indented by four spaces
pub fn render_export(records: &[NewsRecord]) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(INDENT));
    records.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|e| ExportError::Encoding(e.to_string()))
}

/// Writes the export file, replacing any previous one
///
/// An empty batch still writes `[]` so the file always reflects the latest run.
pub fn write_export(path: &Path, records: &[NewsRecord]) -> Result<(), ExportError> {
    let io_error = |source: std::io::Error| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let rendered = render_export(records)?;
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(rendered.as_bytes()).map_err(io_error)?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)?;

    tracing::info!(path = %path.display(), records = records.len(), "Export written");
    Ok(())
}
