//! Flush outcome summary.

use odsync_changeset::HttpMethod;
use odsync_core::HandleId;

/// One request that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub content_id: u32,
    pub method: HttpMethod,
    pub uri: String,
    /// Response status; `None` when no response was received.
    pub status: Option<u16>,
    pub message: String,
    pub handle: Option<HandleId>,
}

/// Summary of a flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Number of requests in the changeset.
    pub submitted: usize,
    /// Number of requests the service accepted.
    pub succeeded: usize,
    /// Requests that failed or were skipped.
    pub failures: Vec<RequestFailure>,
    /// Handles detached from the context.
    pub detached: usize,
    /// Handles kept attached because one of their requests failed.
    pub retained: usize,
    /// Whether submission stopped on cancellation.
    pub cancelled: bool,
}

impl FlushReport {
    pub fn new(submitted: usize) -> Self {
        Self {
            submitted,
            ..Self::default()
        }
    }

    /// Returns true if every request succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}
