//! Executor error types.

use crate::TransportError;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while submitting or reconciling a flush.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A submission did not complete in time.
    #[error("submission timed out after {after:?}")]
    Timeout { after: Duration },

    /// The flush was cancelled.
    #[error("flush cancelled")]
    Cancelled,

    /// The service rejected the changeset or one of its requests.
    #[error("transaction failed with status {status}: {message}")]
    TransactionFailure {
        status: u16,
        message: String,
        content_id: Option<u32>,
    },

    /// Responses do not line up with the submitted requests.
    #[error("inconsistent response: expected {expected} responses, got {actual}")]
    InconsistentResponse { expected: usize, actual: usize },
}

impl ExecutorError {
    pub fn timeout(after: Duration) -> Self {
        Self::Timeout { after }
    }

    pub fn transaction_failure(
        status: u16,
        message: impl Into<String>,
        content_id: Option<u32>,
    ) -> Self {
        Self::TransactionFailure {
            status,
            message: message.into(),
            content_id,
        }
    }

    pub fn inconsistent_response(expected: usize, actual: usize) -> Self {
        Self::InconsistentResponse { expected, actual }
    }
}

/// Result type for executor operations.
pub type ExecutorResult<T> = Result<T, ExecutorError>;
