//! Remote crawl job status as reported by the service

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a crawl job on the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is still discovering and fetching pages
    Scraping,

    /// Job finished and all pages are available
    Completed,

    /// Job stopped because of a server-side error
    Failed,

    /// Job was cancelled on the server
    Cancelled,
}

impl JobStatus {
    /// Returns true if the remote job will not change any further
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Scraping)
    }

    /// Returns true if the job finished successfully
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Converts the status to its wire representation
    pub fn to_wire_string(&self) -> &'static str {
        match self {
            Self::Scraping => "scraping",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its wire representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_wire_string(s: &str) -> Option<Self> {
        match s {
            "scraping" => Some(Self::Scraping),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns all possible job statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Scraping,
            Self::Completed,
            Self::Failed,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire_string())
    }
}
