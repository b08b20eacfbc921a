//! Integration tests for the cyber-news scraper
//!
//! These tests use wiremock to serve listing pages and run the whole
//! fetch → extract → normalize → export → persist cycle against a temporary
//! SQLite store.

mod cli_tests;
mod pipeline_tests;
