//! odsync Compiler
//!
//! Turn an entity context into an ordered, position-indexed changeset.
//!
//! Responsibilities:
//! - Walk dirty entities in attachment order, depth-first along links
//! - Assign content-ids and build `$<n>` forward references
//! - Queue follow-up link updates for references that cannot be bound inline
//! - Append deletes of entities known only by URI

mod compiler;
mod counter;
mod delayed;
mod error;
mod items;

pub use compiler::{compile, CompileOptions, CompiledFlush, DependencyCompiler};
pub use counter::PositionCounter;
pub use delayed::{DelayedLink, DelayedLinkResolver};
pub use error::{CompileError, CompileResult};
pub use items::TransactionItems;
