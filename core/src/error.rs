//! Precondition error types for odsync.
//!
//! These are raised locally, before any request is built.

use thiserror::Error;

/// Errors raised while recording changes on a handle or building addresses.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Navigation property is not declared on the entity type.
    #[error("Unknown navigation property: {property} on type {type_name}")]
    UnknownNavigation { type_name: String, property: String },

    /// Single-valued API used on a collection navigation or vice versa.
    #[error("Cardinality mismatch for navigation {property}: expected {expected}")]
    CardinalityMismatch {
        property: String,
        expected: &'static str,
    },

    /// Link target type is not assignable to the declared target type.
    #[error("Link target type mismatch for {property}: expected {expected}, got {actual}")]
    LinkTargetTypeMismatch {
        property: String,
        expected: String,
        actual: String,
    },

    /// Stream property is not declared on the entity type.
    #[error("Unknown stream property: {property} on type {type_name}")]
    UnknownStream { type_name: String, property: String },

    /// Media stream set on a type that is not a media entity.
    #[error("Type {type_name} is not a media entity")]
    NotMediaEntity { type_name: String },

    /// No entity set could be resolved for an entity.
    #[error("No entity set for entity of type {type_name}")]
    MissingEntitySet { type_name: String },

    /// No key and no edit link could be resolved for an entity.
    #[error("No resolvable key for entity of type {type_name}")]
    MissingKey { type_name: String },

    /// Service root is empty or not absolute.
    #[error("Invalid service root: {root}")]
    InvalidServiceRoot { root: String },
}

impl CoreError {
    pub fn unknown_navigation(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownNavigation {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    pub fn cardinality_mismatch(property: impl Into<String>, collection: bool) -> Self {
        Self::CardinalityMismatch {
            property: property.into(),
            expected: if collection { "collection" } else { "single" },
        }
    }

    pub fn link_target_type_mismatch(
        property: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::LinkTargetTypeMismatch {
            property: property.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn unknown_stream(type_name: impl Into<String>, property: impl Into<String>) -> Self {
        Self::UnknownStream {
            type_name: type_name.into(),
            property: property.into(),
        }
    }

    pub fn not_media_entity(type_name: impl Into<String>) -> Self {
        Self::NotMediaEntity {
            type_name: type_name.into(),
        }
    }

    pub fn missing_entity_set(type_name: impl Into<String>) -> Self {
        Self::MissingEntitySet {
            type_name: type_name.into(),
        }
    }

    pub fn missing_key(type_name: impl Into<String>) -> Self {
        Self::MissingKey {
            type_name: type_name.into(),
        }
    }

    pub fn invalid_service_root(root: impl Into<String>) -> Self {
        Self::InvalidServiceRoot { root: root.into() }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
