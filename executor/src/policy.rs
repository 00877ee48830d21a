//! Submission policy: timeout and cancellation.

use crate::{ExecutorError, ExecutorResult, TransportError};
use log::warn;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Cancels an in-flight flush.
///
/// Clones share state; cancelling one cancels all.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel is not missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// How each transport call is bounded.
#[derive(Debug, Clone, Default)]
pub struct SubmitPolicy {
    pub timeout: Option<Duration>,
    pub cancel: CancelToken,
}

impl SubmitPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one transport call under the timeout, racing cancellation.
    pub async fn run<F, T>(&self, call: F) -> ExecutorResult<T>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        if self.cancel.is_cancelled() {
            warn!("Submission skipped: flush cancelled");
            return Err(ExecutorError::Cancelled);
        }
        let bounded = async {
            match self.timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result.map_err(ExecutorError::from),
                    Err(_) => Err(ExecutorError::timeout(limit)),
                },
                None => call.await.map_err(ExecutorError::from),
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("Submission aborted: flush cancelled");
                Err(ExecutorError::Cancelled)
            }
            result = bounded => result,
        }
    }
}
