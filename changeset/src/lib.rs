//! odsync Changeset
//!
//! Wire-level requests produced by the compiler and the ordered change list
//! handed to an executor.

mod changes;
mod payload;
mod request;

pub use changes::{Changeset, ChangesetPart, PersistenceChanges};
pub use payload::{EntityPayload, NavigationLink};
pub use request::{HttpMethod, RequestBody, RequestKind, WireRequest};
