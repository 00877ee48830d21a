//! Compiler error types.

use odsync_core::HandleId;
use thiserror::Error;

/// Errors that can occur while compiling a flush.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Precondition failure on an entity.
    #[error("Precondition failed: {0}")]
    Core(#[from] odsync_core::CoreError),

    /// Context registration failure.
    #[error("Context error: {0}")]
    Context(#[from] odsync_context::ContextError),

    /// An entity has neither a position nor a server address.
    #[error("No request address for entity {handle}")]
    UnresolvedAddress { handle: HandleId },
}

impl CompileError {
    pub fn unresolved_address(handle: HandleId) -> Self {
        Self::UnresolvedAddress { handle }
    }
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;
