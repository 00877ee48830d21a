//! Session error types.

use crate::FlushState;
use odsync_compiler::CompileError;
use odsync_context::ContextError;
use odsync_core::CoreError;
use odsync_executor::ExecutorError;
use thiserror::Error;

/// Session errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The configuration could not be loaded or is incomplete.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Another flush holds the lease.
    #[error("flush already in progress (state: {state})")]
    FlushInProgress { state: FlushState },

    /// The blocking flush could not start its runtime.
    #[error("failed to start runtime: {message}")]
    Runtime { message: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl SessionError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn flush_in_progress(state: FlushState) -> Self {
        Self::FlushInProgress { state }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
