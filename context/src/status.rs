//! Lifecycle status of an attached entity.

use std::fmt;

/// Attached entity status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachedEntityStatus {
    /// Created locally, never persisted.
    New,
    /// Loaded from the service, unmodified.
    Attached,
    /// Has pending modifications.
    Changed,
    /// Attached only because another entity links to it.
    Linked,
    /// Scheduled for removal.
    Deleted,
}

impl AttachedEntityStatus {
    /// Returns true for statuses that need no request unless the entity is dirty.
    pub fn is_clean_tracked(self) -> bool {
        matches!(self, Self::Attached | Self::Linked)
    }
}

impl fmt::Display for AttachedEntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "NEW",
            Self::Attached => "ATTACHED",
            Self::Changed => "CHANGED",
            Self::Linked => "LINKED",
            Self::Deleted => "DELETED",
        };
        f.write_str(name)
    }
}
