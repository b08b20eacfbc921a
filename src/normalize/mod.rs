//! Record normalization
//!
//! Turns extracted records into their canonical shape: absolute links, parsed
//! dates (or the unknown-date sentinel), split author bylines and tidy text.
//! Normalization is total; a field that cannot be cleaned up is left as close
//! to the input as possible instead of failing the record.

mod date;
mod link;

pub use date::{
    default_date_pattern, find_date_in_text, lookup_offset, parse_date, split_author_date,
    DEFAULT_DATE_PATTERN,
};
pub use link::{resolve_base, resolve_link};

use crate::config::SiteConfig;
use crate::record::{NewsDate, NewsRecord};
use crate::ConfigError;
use chrono::FixedOffset;
use tracing::debug;
use url::Url;

/// Per-site normalizer
#[derive(Debug, Clone)]
pub struct Normalizer {
    base: Url,
    default_offset: FixedOffset,
    author_separator: Option<String>,
}

impl Normalizer {
    /// Builds a normalizer from a validated site descriptor
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        let base = resolve_base(site)?;

        let default_offset = match &site.timezone {
            Some(zone) => lookup_offset(zone).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "site '{}' has unknown timezone '{}'",
                    site.name, zone
                ))
            })?,
            None => FixedOffset::east_opt(0)
                .ok_or_else(|| ConfigError::Validation("invalid UTC offset".to_string()))?,
        };

        Ok(Self {
            base,
            default_offset,
            author_separator: site.dates.author_separator.clone(),
        })
    }

    /// Normalizes one record
    ///
    /// Every normalized record carries a date: parsed when possible, the
    /// unknown-date sentinel otherwise.
    pub fn normalize(&self, mut record: NewsRecord) -> NewsRecord {
        record.title = collapse_whitespace(&record.title);
        record.summary = record.summary.as_deref().and_then(non_empty_collapsed);
        record.author = record.author.as_deref().and_then(non_empty_collapsed);

        match resolve_link(&record.link, &self.base) {
            Ok(link) => record.link = link,
            Err(e) => debug!(link = %record.link, error = %e, "Keeping unresolvable link as-is"),
        }

        record.date = Some(match record.date.take() {
            Some(NewsDate::Raw(raw)) => self.normalize_raw_date(&raw, &mut record.author),
            Some(NewsDate::Parsed(ts)) => NewsDate::Parsed(ts),
            Some(NewsDate::Unknown) | None => NewsDate::Unknown,
        });

        record
    }

    fn normalize_raw_date(&self, raw: &str, author: &mut Option<String>) -> NewsDate {
        let date_text = match &self.author_separator {
            Some(separator) => {
                let (byline, date_text) = split_author_date(raw, separator);
                if author.is_none() {
                    *author = byline.as_deref().and_then(non_empty_collapsed);
                }
                date_text
            }
            None => raw.trim().to_string(),
        };

        match parse_date(&date_text, self.default_offset) {
            Some(ts) => NewsDate::Parsed(ts),
            None => {
                debug!(raw = %raw, "Unparseable date, using sentinel");
                NewsDate::Unknown
            }
        }
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty_collapsed(text: &str) -> Option<String> {
    let collapsed = collapse_whitespace(text);
    (!collapsed.is_empty()).then_some(collapsed)
}
