//! odsync Core Types
//!
//! This crate provides the foundational types used throughout odsync:
//! - Identity types (HandleId, Position, EntityIdentity)
//! - Key values and key predicates (KeyValue, EntityKey)
//! - Entity type descriptors (EntityTypeDef, NavigationProperty)
//! - Entity handles and their pending changes (EntityHandle, ChangeDescriptor)
//! - Service root and reference URI helpers
//! - Precondition error types

pub mod annotations;
mod change;
mod entity;
mod error;
mod id;
mod identity;
mod types;
mod uri;
mod value;

pub use change::*;
pub use entity::*;
pub use error::*;
pub use id::*;
pub use identity::*;
pub use types::*;
pub use uri::*;
pub use value::*;

pub use serde_json;

/// JSON object used for entity payloads, property changes and annotations.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;
