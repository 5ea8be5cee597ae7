//! Crawl Explorer: a client for Firecrawl-compatible crawling services
//!
//! This crate issues scrape, crawl and map requests against a remote crawling
//! API, drives asynchronous crawl jobs to completion, and persists results as
//! categorized, metadata-tagged export files.

pub mod api;
pub mod config;
pub mod explorer;
pub mod export;
pub mod model;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Crawl Explorer operations
#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Service unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Crawl job {job_id} did not finish after {attempts} status checks")]
    TimedOut { job_id: String, attempts: u32 },

    #[error("Crawl job {job_id} ended with status {status}")]
    JobFailed {
        job_id: String,
        status: state::JobStatus,
        partial: Box<model::CrawlResult>,
    },

    #[error("Wait for crawl job {job_id} was cancelled")]
    Cancelled { job_id: String },

    #[error("Result has no {format} content")]
    MissingContent { format: String },

    #[error("Deleted {path} but failed to remove metadata sidecar {sidecar}: {source}")]
    PartialDelete {
        path: PathBuf,
        sidecar: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid poll transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PollPhase,
        to: state::PollPhase,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ExplorerError {
    /// Shorthand for an `InvalidInput` error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an IO error with the path it occurred at
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<UrlError> for ExplorerError {
    fn from(err: UrlError) -> Self {
        Self::invalid("url", err.to_string())
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Crawl Explorer operations
pub type Result<T> = std::result::Result<T, ExplorerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Settings;
pub use explorer::Explorer;
pub use export::{ExportCategory, ExportFormat, ExportMetadata, ExportStore};
pub use state::{JobStatus, PollPhase};
