//! Remote API module for Crawl Explorer
//!
//! # Components
//!
//! - `transport`: authenticated HTTP with uniform error translation
//! - `requests`: option validation and wire request bodies
//! - `client`: typed scrape, map and crawl endpoints
//! - `poller`: drives crawl jobs to completion

mod client;
mod poller;
mod requests;
mod transport;

// Re-export main types
pub use client::{ApiClient, CRAWL_PATH, MAP_PATH, SCRAPE_PATH};
pub use poller::{is_valid_job_id, Clock, CrawlApi, JobPoller, PollProgress, TokioClock};
pub use requests::{
    build_crawl_request, build_map_request, build_scrape_request, CrawlOptions, CrawlRequest,
    MapOptions, MapRequest, PageOptions, PageRequest, ScrapeFormat, ScrapeOptions, ScrapeRequest,
    DEFAULT_CRAWL_LIMIT, DEFAULT_MAP_LIMIT, DEFAULT_MAX_DEPTH, MAX_CRAWL_LIMIT, MAX_MAP_LIMIT,
};
pub use transport::{build_http_client, Transport, IDEMPOTENCY_HEADER};
