//! Crawl job poller
//!
//! Drives one crawl job from submission to a terminal phase:
//!
//! ```text
//! Submitted -> Polling -> Completed
//!     |           |-----> Failed     (remote failed/cancelled, or a hard error)
//!     |           |-----> TimedOut   (attempt budget exhausted)
//!     |           '-----> Cancelled  (caller abandoned the wait)
//!     '-----------------> Failed | Cancelled
//! ```
//!
//! Each attempt fetches the job status, follows `next` cursors up to the
//! configured cap and merges the pages into the accumulated result. Sleeps
//! and in-flight requests are both raced against a [`CancellationToken`].
//! Cancelling only stops local polling; the remote job keeps running.

use crate::api::requests::CrawlRequest;
use crate::config::PollerConfig;
use crate::model::{CrawlResult, CrawlStatusPage};
use crate::state::{JobStatus, PollPhase};
use crate::{ExplorerError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper bound on the backoff multiplier applied after transient errors
const MAX_BACKOFF_FACTOR: u32 = 8;

/// Longest job id accepted from callers
const MAX_JOB_ID_LEN: usize = 128;

/// Remote operations the poller needs
#[async_trait]
pub trait CrawlApi: Send + Sync {
    /// Submits a crawl job and returns its id
    async fn submit_crawl(
        &self,
        request: &CrawlRequest,
        idempotency_key: Option<&str>,
    ) -> Result<String>;

    /// Fetches the first status page of a job
    async fn crawl_status(&self, job_id: &str) -> Result<CrawlStatusPage>;

    /// Fetches a follow-up status page from a `next` cursor
    async fn crawl_status_next(&self, cursor: &str) -> Result<CrawlStatusPage>;
}

/// Source of delays between polls
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Progress reported after every successful status check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
    pub job_id: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub completed: u32,
    pub total: u32,
    pub status: JobStatus,
}

type ProgressFn<'a> = Box<dyn Fn(&PollProgress) + Send + Sync + 'a>;

/// Polls a single crawl job; one poller serves one wait
pub struct JobPoller<'a> {
    api: &'a dyn CrawlApi,
    clock: &'a dyn Clock,
    config: PollerConfig,
    cancel: CancellationToken,
    phase: PollPhase,
    started: bool,
    on_progress: Option<ProgressFn<'a>>,
}

impl<'a> JobPoller<'a> {
    pub fn new(
        api: &'a dyn CrawlApi,
        clock: &'a dyn Clock,
        config: PollerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            clock,
            config,
            cancel,
            phase: PollPhase::Submitted,
            started: false,
            on_progress: None,
        }
    }

    /// Registers a callback invoked after each status check
    pub fn with_progress(mut self, callback: impl Fn(&PollProgress) + Send + Sync + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Submits `request` and waits for the job to finish
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - The job completed; all pages are accumulated
    /// * `Err(JobFailed)` - The service reported `failed` or `cancelled`
    /// * `Err(TimedOut)` - The attempt budget ran out while still scraping
    /// * `Err(Cancelled)` - The cancellation token fired
    pub async fn run(
        &mut self,
        request: &CrawlRequest,
        idempotency_key: Option<&str>,
    ) -> Result<CrawlResult> {
        self.start()?;

        let submitted = race(
            &self.cancel,
            "unsubmitted",
            self.api.submit_crawl(request, idempotency_key),
        )
        .await;

        let job_id = match submitted {
            Ok(id) => id,
            Err(e @ ExplorerError::Cancelled { .. }) => {
                self.transition(PollPhase::Cancelled)?;
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Crawl submission for {} failed: {}", request.url, e);
                self.transition(PollPhase::Failed)?;
                return Err(e);
            }
        };

        if !is_valid_job_id(&job_id) {
            self.transition(PollPhase::Failed)?;
            return Err(ExplorerError::Protocol(format!(
                "Service returned an invalid job id: '{}'",
                job_id
            )));
        }

        tracing::info!("Submitted crawl job {} for {}", job_id, request.url);
        self.poll(&job_id, Some(request.url.clone()), Some(request.limit))
            .await
    }

    /// Waits on a job that was submitted earlier, e.g. after a timeout
    pub async fn resume(&mut self, job_id: &str) -> Result<CrawlResult> {
        self.start()?;

        let job_id = job_id.trim();
        if !is_valid_job_id(job_id) {
            return Err(ExplorerError::invalid(
                "job_id",
                "must be non-empty and contain only letters, digits, '-' or '_'",
            ));
        }

        tracing::info!("Resuming wait on crawl job {}", job_id);
        self.poll(job_id, None, None).await
    }

    async fn poll(
        &mut self,
        job_id: &str,
        url: Option<String>,
        limit: Option<u32>,
    ) -> Result<CrawlResult> {
        self.transition(PollPhase::Polling)?;

        let max_attempts = self.config.max_attempts.max(1);
        let mut result = CrawlResult::new(job_id, url);
        let mut backoff = 1u32;

        for attempt in 1..=max_attempts {
            tracing::debug!("Checking crawl job {} ({}/{})", job_id, attempt, max_attempts);

            match self.fetch_attempt(job_id, &mut result).await {
                Ok(()) => {
                    backoff = 1;
                    self.report(job_id, attempt, max_attempts, &result);

                    match result.status {
                        JobStatus::Completed => {
                            if limit.is_some_and(|limit| result.page_count() >= limit as usize) {
                                result.truncated = true;
                            }
                            self.transition(PollPhase::Completed)?;
                            tracing::info!(
                                "Crawl job {} completed with {} pages",
                                job_id,
                                result.page_count()
                            );
                            return Ok(result);
                        }
                        JobStatus::Failed | JobStatus::Cancelled => {
                            self.transition(PollPhase::Failed)?;
                            tracing::warn!(
                                "Crawl job {} ended with status {} after {} pages",
                                job_id,
                                result.status,
                                result.page_count()
                            );
                            return Err(ExplorerError::JobFailed {
                                job_id: job_id.to_string(),
                                status: result.status,
                                partial: Box::new(result),
                            });
                        }
                        JobStatus::Scraping => {}
                    }
                }
                Err(e @ ExplorerError::Cancelled { .. }) => {
                    self.transition(PollPhase::Cancelled)?;
                    tracing::info!("Stopped waiting on crawl job {}", job_id);
                    return Err(e);
                }
                Err(e) if is_transient(&e) => {
                    backoff = (backoff * 2).min(MAX_BACKOFF_FACTOR);
                    tracing::warn!(
                        "Status check {}/{} for crawl job {} failed: {}",
                        attempt,
                        max_attempts,
                        job_id,
                        e
                    );
                }
                Err(e) => {
                    self.transition(PollPhase::Failed)?;
                    return Err(e);
                }
            }

            if attempt < max_attempts {
                let delay = self.config.poll_interval() * backoff;
                let clock = self.clock;
                let slept = race(&self.cancel, job_id, async move {
                    clock.sleep(delay).await;
                    Ok::<(), ExplorerError>(())
                })
                .await;

                if let Err(e) = slept {
                    self.transition(PollPhase::Cancelled)?;
                    tracing::info!("Stopped waiting on crawl job {}", job_id);
                    return Err(e);
                }
            }
        }

        self.transition(PollPhase::TimedOut)?;
        tracing::warn!(
            "Crawl job {} still running after {} status checks",
            job_id,
            max_attempts
        );
        Err(ExplorerError::TimedOut {
            job_id: job_id.to_string(),
            attempts: max_attempts,
        })
    }

    /// One status check, following `next` cursors up to the configured cap
    async fn fetch_attempt(&self, job_id: &str, result: &mut CrawlResult) -> Result<()> {
        let page = race(&self.cancel, job_id, self.api.crawl_status(job_id)).await?;
        result.update_progress(&page);

        let mut next = page.next.clone();
        result.merge_pages(page.data);

        let mut follows = 0u32;
        while let Some(cursor) = next.take() {
            if follows >= self.config.max_page_follows {
                tracing::warn!(
                    "Crawl job {}: stopped following result pages after {}",
                    job_id,
                    follows
                );
                result.truncated = true;
                break;
            }

            let page = race(&self.cancel, job_id, self.api.crawl_status_next(&cursor)).await?;
            follows += 1;
            next = page.next.clone();
            let added = result.merge_pages(page.data);
            tracing::debug!("Crawl job {}: cursor page added {} pages", job_id, added);
        }

        Ok(())
    }

    fn report(&self, job_id: &str, attempt: u32, max_attempts: u32, result: &CrawlResult) {
        if let Some(callback) = &self.on_progress {
            callback(&PollProgress {
                job_id: job_id.to_string(),
                attempt,
                max_attempts,
                completed: result.completed,
                total: result.total,
                status: result.status,
            });
        }
    }

    /// Marks the poller as used; a poller serves exactly one wait
    fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(ExplorerError::InvalidTransition {
                from: self.phase,
                to: PollPhase::Polling,
            });
        }
        self.started = true;
        Ok(())
    }

    fn transition(&mut self, to: PollPhase) -> Result<()> {
        if !self.phase.can_transition_to(to) {
            return Err(ExplorerError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        tracing::debug!("Poll phase {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }
}

/// Runs `fut` unless the token fires first
async fn race<T>(
    cancel: &CancellationToken,
    job_id: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExplorerError::Cancelled {
            job_id: job_id.to_string(),
        }),
        result = fut => result,
    }
}

/// Errors worth another status check
fn is_transient(err: &ExplorerError) -> bool {
    match err {
        ExplorerError::Unreachable { .. } => true,
        ExplorerError::Api { status, .. } => *status >= 500 || *status == 429,
        _ => false,
    }
}

/// Job ids are interpolated into URL paths, so only a safe alphabet is allowed
pub fn is_valid_job_id(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id.len() <= MAX_JOB_ID_LEN
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
