//! State module for tracking crawl jobs
//!
//! # Components
//!
//! - `JobStatus`: the status reported by the remote service for a crawl job
//! - `PollPhase`: the local phase of one wait on a crawl job

mod job_status;
mod poll_phase;

// Re-export main types
pub use job_status::JobStatus;
pub use poll_phase::PollPhase;
