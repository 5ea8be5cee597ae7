//! Collaborator-facing facade
//!
//! [`Explorer`] owns the current settings together with the API client and
//! export store built from them. Presentation layers (the bundled CLI or
//! anything else) talk to the service and the export directory only through
//! it.

use crate::api::{
    ApiClient, Clock, CrawlOptions, JobPoller, MapOptions, PollProgress, ScrapeOptions,
    TokioClock,
};
use crate::config::{validate, Settings, SettingsUpdate};
use crate::export::{
    ExportCategory, ExportContent, ExportFormat, ExportMetadata, ExportRecord, ExportStore,
    ExportSummary,
};
use crate::model::{ApiResult, CrawlResult, MapResult, ScrapeResult};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a result should be persisted
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub format: ExportFormat,
    /// Defaults to the result's own category
    pub category: Option<ExportCategory>,
    pub filename: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl ExportOptions {
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            category: None,
            filename: None,
            description: None,
            tags: Vec::new(),
        }
    }
}

/// Entry point for scraping, crawling, mapping and managing exports
pub struct Explorer {
    settings: Settings,
    client: ApiClient,
    store: ExportStore,
    clock: Arc<dyn Clock>,
}

impl Explorer {
    /// Builds an explorer from validated settings
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_clock(settings, Arc::new(TokioClock))
    }

    /// Like [`Explorer::new`] with a custom clock for crawl polling
    pub fn with_clock(mut settings: Settings, clock: Arc<dyn Clock>) -> Result<Self> {
        settings.normalize();
        validate(&settings)?;

        let client = ApiClient::new(&settings.api)?;
        let store = ExportStore::new(settings.exports.clone());

        tracing::debug!(
            "Explorer ready (service: {}, key: {}, exports: {})",
            settings.api.base_url,
            settings.api.masked_api_key(),
            settings.exports.root_dir.display()
        );

        Ok(Self {
            settings,
            client,
            store,
            clock,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &ExportStore {
        &self.store
    }

    /// Validates an update and rebuilds the client and store from it
    ///
    /// On error nothing changes.
    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<&Settings> {
        let next = self.settings.apply(update)?;
        let client = ApiClient::new(&next.api)?;

        self.store = ExportStore::new(next.exports.clone());
        self.client = client;
        self.settings = next;

        tracing::info!(
            "Settings updated (service: {}, key: {})",
            self.settings.api.base_url,
            self.settings.api.masked_api_key()
        );
        Ok(&self.settings)
    }

    pub async fn scrape(&self, options: &ScrapeOptions) -> Result<ScrapeResult> {
        self.client.scrape(options).await
    }

    pub async fn map(&self, options: &MapOptions) -> Result<MapResult> {
        self.client.map(options).await
    }

    /// Submits a crawl and waits until it finishes, times out or is cancelled
    pub async fn crawl(
        &self,
        options: &CrawlOptions,
        cancel: CancellationToken,
    ) -> Result<CrawlResult> {
        self.crawl_with(options, None, cancel, |_| {}).await
    }

    /// [`Explorer::crawl`] with an idempotency key and a progress callback
    pub async fn crawl_with<F>(
        &self,
        options: &CrawlOptions,
        idempotency_key: Option<&str>,
        cancel: CancellationToken,
        on_progress: F,
    ) -> Result<CrawlResult>
    where
        F: Fn(&PollProgress) + Send + Sync,
    {
        let request = crate::api::build_crawl_request(options)?;
        let mut poller = self.poller(cancel).with_progress(on_progress);
        poller.run(&request, idempotency_key).await
    }

    /// Waits on an already submitted crawl job
    pub async fn resume_crawl(
        &self,
        job_id: &str,
        cancel: CancellationToken,
    ) -> Result<CrawlResult> {
        self.resume_crawl_with(job_id, cancel, |_| {}).await
    }

    pub async fn resume_crawl_with<F>(
        &self,
        job_id: &str,
        cancel: CancellationToken,
        on_progress: F,
    ) -> Result<CrawlResult>
    where
        F: Fn(&PollProgress) + Send + Sync,
    {
        let mut poller = self.poller(cancel).with_progress(on_progress);
        poller.resume(job_id).await
    }

    fn poller(&self, cancel: CancellationToken) -> JobPoller<'_> {
        JobPoller::new(
            &self.client,
            self.clock.as_ref(),
            self.settings.poller.clone(),
            cancel,
        )
    }

    /// Renders a result and saves it with metadata
    pub fn save_export(&self, result: &ApiResult, options: &ExportOptions) -> Result<PathBuf> {
        let payload = result.render(options.format)?;

        let mut metadata = ExportMetadata::new(result.source_url()).with_tags(&options.tags);
        if let Some(description) = &options.description {
            metadata = metadata.with_description(description.as_str());
        }

        self.save_record(&ExportRecord {
            category: options.category.unwrap_or_else(|| result.default_category()),
            format: options.format,
            payload,
            metadata,
            filename: options.filename.clone(),
        })
    }

    /// Saves an already rendered record, e.g. notes filed under `doc`
    pub fn save_record(&self, record: &ExportRecord) -> Result<PathBuf> {
        self.store.save(record)
    }

    pub fn list_exports(
        &self,
        category: ExportCategory,
        search: Option<&str>,
    ) -> Result<Vec<ExportSummary>> {
        self.store.list(category, search)
    }

    pub fn read_export(&self, path: &Path) -> Result<ExportContent> {
        self.store.read(path)
    }

    pub fn delete_export(&self, path: &Path) -> Result<()> {
        self.store.delete(path)
    }
}
