//! Integration tests for Crawl Explorer
//!
//! These tests run the public API against wiremock servers standing in for
//! the crawling service, with exports written to temporary directories.

mod common;
mod crawl_tests;
mod export_tests;
mod scrape_map_tests;
