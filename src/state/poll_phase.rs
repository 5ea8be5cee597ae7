//! Local lifecycle of a single crawl wait

use std::fmt;

/// Phase of the job poller for one crawl invocation
///
/// ```text
/// Submitted -> Polling -> Completed
///     |           |----> Failed
///     |           |----> TimedOut
///     |           `----> Cancelled
///     `----------------> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollPhase {
    /// Crawl request is being submitted
    Submitted,

    /// Job id known, status checks in progress
    Polling,

    /// Remote job completed
    Completed,

    /// Submission failed, or the remote job failed or was cancelled
    Failed,

    /// Attempt ceiling reached while the job was still running
    TimedOut,

    /// Caller abandoned the wait; the remote job keeps running
    Cancelled,
}

impl PollPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Submitted | Self::Polling)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: PollPhase) -> bool {
        matches!(
            (self, next),
            (Self::Submitted, Self::Polling)
                | (Self::Submitted, Self::Failed)
                | (Self::Submitted, Self::Cancelled)
                | (Self::Polling, Self::Completed)
                | (Self::Polling, Self::Failed)
                | (Self::Polling, Self::TimedOut)
                | (Self::Polling, Self::Cancelled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Polling => "polling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
