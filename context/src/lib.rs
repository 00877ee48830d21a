//! odsync Context
//!
//! Registry of the entity handles attached to one unit of work.
//!
//! Responsibilities:
//! - Track each attached handle with its lifecycle status
//! - Preserve attachment order (it seeds changeset numbering)
//! - Guarantee one handle per resolved identity
//! - Hold deletes of entities known only by URI

mod context;
mod error;
mod status;

pub use context::EntityContext;
pub use error::{ContextError, ContextResult};
pub use status::AttachedEntityStatus;
