//! Record extraction from listing HTML
//!
//! This module walks the listing containers of a parsed page and pulls:
//! - Title and link (required; a miss drops the entry with a warning)
//! - Summary, author and date (optional)
//! - A date found inside noisy metadata text when no dedicated date node exists
//!
//! Selectors are compiled once per extractor. Entries are processed lazily
//! and independently, so one malformed entry never aborts the batch.

use crate::config::{SelectorConfig, SiteConfig};
use crate::normalize::{
    collapse_whitespace, default_date_pattern, find_date_in_text, resolve_base, resolve_link,
};
use crate::record::{ExtractionWarning, NewsDate, NewsRecord, RecordField};
use crate::{truncate_diagnostic, ConfigError};
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

/// Maximum length of a per-entry diagnostic
pub const WARNING_REASON_LIMIT: usize = 50;

/// A compiled selector plus its source text for diagnostics
#[derive(Debug, Clone)]
struct FieldSelector {
    source: String,
    selector: Selector,
}

impl FieldSelector {
    fn compile(field: &str, source: &str) -> Result<Self, ConfigError> {
        let selector = Selector::parse(source).map_err(|e| {
            ConfigError::InvalidSelector(format!("{} selector '{}': {}", field, source, e))
        })?;
        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    fn compile_opt(field: &str, source: Option<&str>) -> Result<Option<Self>, ConfigError> {
        source.map(|s| Self::compile(field, s)).transpose()
    }

    fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        scope.select(&self.selector).next()
    }
}

/// Every selector of a site, compiled
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    container: FieldSelector,
    title: FieldSelector,
    summary: Option<FieldSelector>,
    link: Option<FieldSelector>,
    link_attr: String,
    date: Option<FieldSelector>,
    meta: Option<FieldSelector>,
    author: Option<FieldSelector>,
}

impl CompiledSelectors {
    /// Compiles a selector set, rejecting the first invalid selector
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            container: FieldSelector::compile("container", &config.container)?,
            title: FieldSelector::compile("title", &config.title)?,
            summary: FieldSelector::compile_opt("summary", config.summary.as_deref())?,
            link: FieldSelector::compile_opt("link", config.link.as_deref())?,
            link_attr: config.link_attr.clone(),
            date: FieldSelector::compile_opt("date", config.date.as_deref())?,
            meta: FieldSelector::compile_opt("meta", config.meta.as_deref())?,
            author: FieldSelector::compile_opt("author", config.author.as_deref())?,
        })
    }
}

/// One step of an extraction
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Record(NewsRecord),
    Warning(ExtractionWarning),
}

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct ExtractedBatch {
    /// Containers processed
    pub processed: usize,
    pub records: Vec<NewsRecord>,
    pub warnings: Vec<ExtractionWarning>,
}

/// Per-site record extractor
#[derive(Debug, Clone)]
pub struct Extractor {
    selectors: CompiledSelectors,
    base: Url,
    source: String,
    date_pattern: Regex,
}

impl Extractor {
    /// Builds an extractor from a site descriptor
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        let date_pattern = match &site.dates.pattern {
            Some(pattern) => Regex::new(pattern).map_err(|e| {
                ConfigError::Validation(format!(
                    "site '{}' date pattern does not compile: {}",
                    site.name, e
                ))
            })?,
            None => default_date_pattern(),
        };

        Ok(Self {
            selectors: CompiledSelectors::compile(&site.selectors)?,
            base: resolve_base(site)?,
            source: site.source.clone(),
            date_pattern,
        })
    }

    /// Lazily extracts one item per listing container, in document order
    ///
    /// The extraction time is read once, here, and shared by every record.
    pub fn extract<'a>(&'a self, doc: &'a Html) -> Extraction<'a> {
        Extraction {
            extractor: self,
            containers: doc.select(&self.selectors.container.selector),
            index: 0,
            scraped_at: Utc::now(),
        }
    }

    /// Parses `html` and drains the extraction into a batch
    ///
    /// The parsed DOM lives only inside this call.
    pub fn extract_page(&self, html: &str) -> ExtractedBatch {
        let doc = Html::parse_document(html);
        let mut batch = ExtractedBatch::default();

        for item in self.extract(&doc) {
            batch.processed += 1;
            match item {
                Extracted::Record(record) => batch.records.push(record),
                Extracted::Warning(warning) => batch.warnings.push(warning),
            }
        }

        batch
    }

    fn extract_entry(
        &self,
        index: usize,
        entry: ElementRef<'_>,
        scraped_at: DateTime<Utc>,
    ) -> Extracted {
        let selectors = &self.selectors;

        let title = match self.required_text(entry, &selectors.title) {
            Ok(title) => title,
            Err(reason) => return warning(index, RecordField::Title, &reason),
        };

        let link = match self.link(entry) {
            Ok(link) => link,
            Err(reason) => return warning(index, RecordField::Link, &reason),
        };

        let mut record = NewsRecord::new(title, link, self.source.clone(), scraped_at);
        record.summary = optional_text(entry, selectors.summary.as_ref());
        record.author = optional_text(entry, selectors.author.as_ref());
        record.date = self.date(entry).map(NewsDate::Raw);

        debug!(index, link = %record.link, date = ?record.date, "Extracted entry");
        Extracted::Record(record)
    }

    fn required_text(
        &self,
        entry: ElementRef<'_>,
        field: &FieldSelector,
    ) -> Result<String, String> {
        let node = field
            .first(entry)
            .ok_or_else(|| format!("no element matches '{}'", field.source))?;
        let text = element_text(node);
        if text.is_empty() {
            return Err(format!("'{}' has no text", field.source));
        }
        Ok(text)
    }

    fn link(&self, entry: ElementRef<'_>) -> Result<String, String> {
        let attr = self.selectors.link_attr.as_str();

        let node = match &self.selectors.link {
            Some(field) => field
                .first(entry)
                .ok_or_else(|| format!("no element matches '{}'", field.source))?,
            None => entry,
        };

        let href = node
            .value()
            .attr(attr)
            .ok_or_else(|| format!("no '{}' attribute", attr))?;

        resolve_link(href, &self.base).map_err(|e| e.to_string())
    }

    fn date(&self, entry: ElementRef<'_>) -> Option<String> {
        if let Some(date) = optional_text(entry, self.selectors.date.as_ref()) {
            return Some(date);
        }

        let meta = optional_text(entry, self.selectors.meta.as_ref())?;
        let found = find_date_in_text(&meta, &self.date_pattern);
        if found.is_none() {
            debug!(meta = %meta, "No date found in metadata");
        }
        found
    }
}

/// Lazy iterator over the entries of one page
///
/// Finite and single-pass; borrows the parsed document.
pub struct Extraction<'a> {
    extractor: &'a Extractor,
    containers: scraper::html::Select<'a, 'a>,
    index: usize,
    scraped_at: DateTime<Utc>,
}

impl<'a> Extraction<'a> {
    /// Time stamped on every record of this extraction
    pub fn scraped_at(&self) -> DateTime<Utc> {
        self.scraped_at
    }
}

impl<'a> Iterator for Extraction<'a> {
    type Item = Extracted;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.containers.next()?;
        let index = self.index;
        self.index += 1;
        Some(self.extractor.extract_entry(index, entry, self.scraped_at))
    }
}

fn warning(index: usize, field: RecordField, reason: &str) -> Extracted {
    let warning = ExtractionWarning {
        index,
        field,
        reason: truncate_diagnostic(reason, WARNING_REASON_LIMIT),
    };
    debug!(%warning, "Dropped entry");
    Extracted::Warning(warning)
}

fn element_text(node: ElementRef<'_>) -> String {
    collapse_whitespace(&node.text().collect::<Vec<_>>().join(" "))
}

fn optional_text(entry: ElementRef<'_>, field: Option<&FieldSelector>) -> Option<String> {
    field
        .and_then(|f| f.first(entry))
        .map(element_text)
        .filter(|text| !text.is_empty())
}
