//! URL handling module for Crawl Explorer
//!
//! Target URL validation for outgoing requests, host extraction, and
//! filename slugs derived from source URLs.

mod domain;
mod slug;
mod target;

// Re-export main functions
pub use domain::extract_domain;
pub use slug::{sanitize_file_stem, slug_from_url};
pub use target::parse_target_url;
