//! Identity types for odsync handles and changeset positions.
//!
//! Handle identifiers are:
//! - Unique within the process
//! - Immutable once assigned
//! - Opaque to external users

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an entity handle.
///
/// Two handles are the same entity instance exactly when their ids match,
/// which is the identity used before a server key is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl HandleId {
    /// Allocate the next free id.
    pub fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a HandleId from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

/// 1-based content-id of a request inside one changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position(pub u32);

impl Position {
    pub fn new(pos: u32) -> Self {
        Self(pos)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Forward reference to the entity created or addressed at this position.
    pub fn reference(&self) -> String {
        format!("${}", self.0)
    }

    /// Forward reference to the media stream of the entity at this position.
    pub fn value_reference(&self) -> String {
        format!("${}/$value", self.0)
    }

    /// Forward reference to a named sub-resource of the entity at this position.
    pub fn sub_reference(&self, segment: &str) -> String {
        format!("${}/{}", self.0, segment)
    }

    /// Zero-based index of the request in wire order.
    pub fn index(&self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}
