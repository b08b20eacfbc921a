//! Record types shared by every pipeline stage
//!
//! [`NewsRecord`] is the unit of extraction and storage, [`ExtractionWarning`]
//! the per-record diagnostic the extractor emits instead of failing, and
//! [`RunResult`] the aggregate outcome of one run.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder stored when a date could not be parsed
pub const UNKNOWN_DATE: &str = "Unknown Date";

/// A news article or advisory extracted from a listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub title: String,
    pub summary: Option<String>,
    /// Absolute URL; the record's identity in the store
    pub link: String,
    pub date: Option<NewsDate>,
    pub author: Option<String>,
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}

impl NewsRecord {
    /// Creates a record with only the required fields set
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        source: impl Into<String>,
        scraped_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: None,
            link: link.into(),
            date: None,
            author: None,
            source: source.into(),
            scraped_at,
        }
    }
}

/// Publication date of a record
///
/// The extractor produces `Raw` text; the normalizer turns it into either
/// `Parsed` or the `Unknown` sentinel. All three serialize to one JSON string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsDate {
    Raw(String),
    Parsed(DateTime<FixedOffset>),
    Unknown,
}

impl NewsDate {
    /// Returns the parsed timestamp, if any
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Parsed(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for NewsDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(raw) => f.write_str(raw),
            Self::Parsed(ts) => f.write_str(&ts.to_rfc3339()),
            Self::Unknown => f.write_str(UNKNOWN_DATE),
        }
    }
}

impl Serialize for NewsDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NewsDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text == UNKNOWN_DATE {
            return Ok(Self::Unknown);
        }
        Ok(match DateTime::parse_from_rfc3339(&text) {
            Ok(ts) => Self::Parsed(ts),
            Err(_) => Self::Raw(text),
        })
    }
}

/// Field of a listing entry that a selector targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordField {
    Title,
    Summary,
    Link,
    Date,
    Author,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Summary => "summary",
            Self::Link => "link",
            Self::Date => "date",
            Self::Author => "author",
        };
        f.write_str(name)
    }
}

/// A listing entry that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionWarning {
    /// Position of the container in document order (0-based)
    pub index: usize,
    pub field: RecordField,
    /// Diagnostic, already truncated
    pub reason: String,
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entry #{}: missing {}: {}",
            self.index, self.field, self.reason
        )
    }
}

/// Outcome of inserting a batch into the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub skipped: usize,
}

/// Aggregate outcome of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// Source name of the site that was scraped
    pub source: String,

    /// Number of pages fetched (one per successful run)
    pub fetched_count: usize,

    /// Number of listing containers processed by the extractor
    pub extracted_count: usize,

    /// Number of containers that produced a valid record
    pub record_count: usize,

    /// Records newly inserted into the store
    pub saved_count: usize,

    /// Records whose link was already stored
    pub skipped_count: usize,

    /// Wall-clock time for the whole run
    pub duration: Duration,

    /// Per-record extraction warnings, in document order
    pub warnings: Vec<ExtractionWarning>,

    /// Ordered per-record diagnostic strings
    pub errors: Vec<String>,

    /// The normalized batch
    pub records: Vec<NewsRecord>,

    /// Where the flat export was written, if anywhere
    pub export_path: Option<PathBuf>,
}

impl RunResult {
    /// Returns true if any entry was dropped during extraction
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub(crate) fn push_warning(&mut self, warning: ExtractionWarning) {
        self.errors.push(warning.to_string());
        self.warnings.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> NewsRecord {
        let scraped_at = Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap();
        let mut record = NewsRecord::new(
            "Critical flaw patched",
            "https://example.com/news/1",
            "Example",
            scraped_at,
        );
        record.summary = Some("Vendor ships fix".to_string());
        record
    }

    #[test]
    fn test_parsed_date_serializes_as_rfc3339() {
        let ts = DateTime::parse_from_rfc3339("2024-03-15T00:00:00+05:30").unwrap();
        let mut record = sample_record();
        record.date = Some(NewsDate::Parsed(ts));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], "2024-03-15T00:00:00+05:30");
        assert_eq!(json["link"], "https://example.com/news/1");
        assert_eq!(json["author"], serde_json::Value::Null);
    }

    #[test]
    fn test_unknown_date_serializes_as_sentinel() {
        let mut record = sample_record();
        record.date = Some(NewsDate::Unknown);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["date"], UNKNOWN_DATE);
    }

    #[test]
    fn test_date_deserialization_recovers_variants() {
        let parsed: NewsDate = serde_json::from_str("\"2024-03-15T00:00:00+05:30\"").unwrap();
        assert!(parsed.timestamp().is_some());

        let unknown: NewsDate = serde_json::from_str("\"Unknown Date\"").unwrap();
        assert!(unknown.is_unknown());

        let raw: NewsDate = serde_json::from_str("\"last Tuesday\"").unwrap();
        assert_eq!(raw, NewsDate::Raw("last Tuesday".to_string()));
    }

    #[test]
    fn test_warning_display() {
        let warning = ExtractionWarning {
            index: 3,
            field: RecordField::Link,
            reason: "no element matches 'a'".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "entry #3: missing link: no element matches 'a'"
        );
    }

    #[test]
    fn test_push_warning_records_diagnostic() {
        let mut result = RunResult::default();
        result.push_warning(ExtractionWarning {
            index: 0,
            field: RecordField::Title,
            reason: "empty text".to_string(),
        });
        assert!(result.is_partial());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("title"));
    }
}
