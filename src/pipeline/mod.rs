//! Scraping pipeline: fetch, extract, normalize, persist
//!
//! This module contains:
//! - Page fetchers for static and browser-rendered sites
//! - The selector-driven record extractor
//! - The run controller that sequences one run

mod browser;
mod controller;
mod extractor;
mod fetcher;

pub use browser::{find_chrome, BrowserFetcher, CHROME_ARGS, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};
pub use controller::{RunController, RUN_DIAGNOSTIC_LIMIT};
pub use extractor::{
    CompiledSelectors, Extracted, ExtractedBatch, Extraction, Extractor, WARNING_REASON_LIMIT,
};
pub use fetcher::{
    build_http_client, fetcher_for, FetchError, HtmlDocument, HttpFetcher, PageFetcher,
};
