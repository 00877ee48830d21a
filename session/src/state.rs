//! Flush state tracking.

use crate::{SessionError, SessionResult};
use log::debug;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Phase of a flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushState {
    #[default]
    Idle,
    Compiling,
    Submitting,
    Reconciling,
}

impl fmt::Display for FlushState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlushState::Idle => "idle",
            FlushState::Compiling => "compiling",
            FlushState::Submitting => "submitting",
            FlushState::Reconciling => "reconciling",
        };
        write!(f, "{}", name)
    }
}

/// Shared view of the current flush state.
///
/// Clones observe the same state, so progress can be watched from another
/// task while a flush runs.
#[derive(Debug, Clone, Default)]
pub struct FlushTracker {
    state: Arc<Mutex<FlushState>>,
}

impl FlushTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FlushState {
        *self.state.lock().expect("flush state lock poisoned")
    }

    /// Take the flush lease, moving to `Compiling`.
    pub fn begin(&self) -> SessionResult<FlushLease> {
        let mut state = self.state.lock().expect("flush state lock poisoned");
        if *state != FlushState::Idle {
            return Err(SessionError::flush_in_progress(*state));
        }
        *state = FlushState::Compiling;
        Ok(FlushLease {
            state: Arc::clone(&self.state),
        })
    }
}

/// Exclusive right to run one flush. Dropping it returns to `Idle`.
#[derive(Debug)]
pub struct FlushLease {
    state: Arc<Mutex<FlushState>>,
}

impl FlushLease {
    pub fn state(&self) -> FlushState {
        *self.state.lock().expect("flush state lock poisoned")
    }

    pub fn advance(&self, next: FlushState) {
        let mut state = self.state.lock().expect("flush state lock poisoned");
        debug!("Flush {} -> {}", *state, next);
        *state = next;
    }
}

impl Drop for FlushLease {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            *state = FlushState::Idle;
        }
    }
}
