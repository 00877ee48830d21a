//! Context error types.

use odsync_core::{EntityIdentity, HandleId};
use thiserror::Error;

/// Errors raised by the entity context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// Handle is not attached to this context.
    #[error("entity {handle} is not attached")]
    NotAttached { handle: HandleId },

    /// Another handle is already registered for the same identity.
    #[error("entity {identity} is already attached as {existing}")]
    DuplicateIdentity {
        identity: EntityIdentity,
        existing: HandleId,
    },
}

impl ContextError {
    pub fn not_attached(handle: HandleId) -> Self {
        Self::NotAttached { handle }
    }

    pub fn duplicate_identity(identity: EntityIdentity, existing: HandleId) -> Self {
        Self::DuplicateIdentity { identity, existing }
    }
}

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;
