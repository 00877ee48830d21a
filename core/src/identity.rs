//! Entity identity.
//!
//! An entity is identified by `(entity set, type, key)`. Once both the
//! entity set and the key are known the identity compares by value; before
//! that only the handle itself identifies the entity.

use crate::{EntityKey, HandleId};
use std::fmt;

/// The tuple identifying one server-side entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityIdentity {
    /// Entity set the entity lives in.
    pub entity_set: Option<String>,
    /// Declared (qualified) type name.
    pub type_name: String,
    /// Key, absent before the entity is persisted.
    pub key: Option<EntityKey>,
}

impl EntityIdentity {
    pub fn new(
        entity_set: Option<String>,
        type_name: impl Into<String>,
        key: Option<EntityKey>,
    ) -> Self {
        Self {
            entity_set,
            type_name: type_name.into(),
            key,
        }
    }

    /// Identity of a persisted entity.
    pub fn resolved(
        entity_set: impl Into<String>,
        type_name: impl Into<String>,
        key: impl Into<EntityKey>,
    ) -> Self {
        Self {
            entity_set: Some(entity_set.into()),
            type_name: type_name.into(),
            key: Some(key.into()),
        }
    }

    /// Returns true when both entity set and key are known.
    pub fn is_resolved(&self) -> bool {
        self.entity_set.is_some() && self.key.is_some()
    }

    /// Relative entity path (`Customers('ALFKI')`) when resolved.
    pub fn path(&self) -> Option<String> {
        match (&self.entity_set, &self.key) {
            (Some(set), Some(key)) => Some(format!("{}{}", set, key.to_predicate())),
            _ => None,
        }
    }
}

impl fmt::Display for EntityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path() {
            Some(path) => write!(f, "{}", path),
            None => write!(
                f,
                "{}[{}]",
                self.entity_set.as_deref().unwrap_or("?"),
                self.type_name
            ),
        }
    }
}

/// Identity used for registry lookups: by value once resolved, by handle before.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Resolved(EntityIdentity),
    Handle(HandleId),
}

impl IdentityKey {
    pub fn of(identity: EntityIdentity, handle: HandleId) -> Self {
        if identity.is_resolved() {
            IdentityKey::Resolved(identity)
        } else {
            IdentityKey::Handle(handle)
        }
    }
}
