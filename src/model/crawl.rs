//! Crawl job status pages and the accumulated crawl result

use crate::model::Document;
use crate::state::JobStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One response from `GET /v1/crawl/{id}` or from a `next` cursor
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatusPage {
    pub status: JobStatus,

    #[serde(default)]
    pub completed: u32,

    #[serde(default)]
    pub total: u32,

    #[serde(default)]
    pub credits_used: Option<u64>,

    #[serde(default)]
    pub expires_at: Option<String>,

    /// Absolute URL of the next page of results, if any
    #[serde(default)]
    pub next: Option<String>,

    #[serde(default)]
    pub data: Vec<Document>,
}

/// Pages and progress accumulated for one crawl job
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    pub job_id: String,

    /// Root URL of the crawl, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub status: JobStatus,

    /// Pages the service reports as done
    pub completed: u32,

    /// Pages the service expects in total
    pub total: u32,

    /// True when the page limit was reached or cursor following was capped
    pub truncated: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,

    pub pages: Vec<Document>,

    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl CrawlResult {
    /// Creates an empty result for a freshly submitted job
    pub fn new(job_id: impl Into<String>, url: Option<String>) -> Self {
        Self {
            job_id: job_id.into(),
            url,
            status: JobStatus::Scraping,
            completed: 0,
            total: 0,
            truncated: false,
            expires_at: None,
            pages: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Records the progress fields of a status page
    pub fn update_progress(&mut self, page: &CrawlStatusPage) {
        self.status = page.status;
        self.completed = page.completed;
        self.total = page.total;
        if page.expires_at.is_some() {
            self.expires_at = page.expires_at.clone();
        }
    }

    /// Merges documents into the accumulated pages
    ///
    /// A document whose source URL is already present replaces the earlier
    /// copy in place; everything else is appended. Returns the number of
    /// newly added pages.
    pub fn merge_pages(&mut self, documents: Vec<Document>) -> usize {
        let mut added = 0;

        for doc in documents {
            match doc.source_url().map(str::to_string) {
                Some(key) => {
                    if let Some(&pos) = self.index.get(&key) {
                        self.pages[pos] = doc;
                    } else {
                        self.index.insert(key, self.pages.len());
                        self.pages.push(doc);
                        added += 1;
                    }
                }
                None => {
                    self.pages.push(doc);
                    added += 1;
                }
            }
        }

        added
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
