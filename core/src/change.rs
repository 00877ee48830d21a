//! Pending-change view of an entity handle.
//!
//! The compiler never talks to a handle's internals. It works from a
//! [`ChangeDescriptor`]: a snapshot of the property, link and stream changes
//! plus the addressing data (identity, edit link, etag) of one entity.

use crate::{
    EntityHandle, EntityIdentity, HandleId, JsonMap, NavigationProperty, ServiceRoot,
};

/// A pending binary payload for a media stream or named stream property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChange {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl StreamChange {
    pub fn new(content_type: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// Targets of one navigation-link change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTargets {
    Single(EntityHandle),
    /// Ordered, without duplicates.
    Collection(Vec<EntityHandle>),
}

impl LinkTargets {
    pub fn is_collection(&self) -> bool {
        matches!(self, LinkTargets::Collection(_))
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityHandle> {
        let slice: &[EntityHandle] = match self {
            LinkTargets::Single(handle) => std::slice::from_ref(handle),
            LinkTargets::Collection(handles) => handles,
        };
        slice.iter()
    }

    pub fn len(&self) -> usize {
        match self {
            LinkTargets::Single(_) => 1,
            LinkTargets::Collection(handles) => handles.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A pending change to one navigation property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChange {
    pub property: NavigationProperty,
    pub targets: LinkTargets,
}

/// A pending reference-only link: adds an entity known by URI to a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceLink {
    pub property: String,
    pub uri: String,
}

/// Read-only snapshot of everything the compiler needs from one handle.
#[derive(Debug, Clone)]
pub struct ChangeDescriptor {
    pub handle: HandleId,
    pub identity: EntityIdentity,
    pub edit_link: Option<String>,
    pub media_edit_link: Option<String>,
    pub etag: Option<String>,
    /// Whether the entity already exists on the service.
    pub persisted: bool,
    pub is_media_entity: bool,
    /// Last known server state.
    pub payload: JsonMap,
    pub property_changes: JsonMap,
    pub annotations: JsonMap,
    /// Link changes in navigation-declaration order.
    pub links: Vec<LinkChange>,
    pub references: Vec<ReferenceLink>,
    pub media: Option<StreamChange>,
    /// Named stream changes, ordered by property name.
    pub streams: Vec<(String, StreamChange)>,
}

impl ChangeDescriptor {
    /// Returns true if anything is pending on this entity.
    pub fn is_changed(&self) -> bool {
        !self.property_changes.is_empty()
            || !self.annotations.is_empty()
            || !self.links.is_empty()
            || !self.references.is_empty()
            || self.has_stream_changes()
    }

    pub fn has_stream_changes(&self) -> bool {
        self.media.is_some() || !self.streams.is_empty()
    }

    /// Server address of the entity, if it has a real identity.
    pub fn real_uri(&self, root: &ServiceRoot) -> Option<String> {
        if let Some(link) = &self.edit_link {
            return Some(root.resolve(link));
        }
        if !self.persisted {
            return None;
        }
        match (&self.identity.entity_set, &self.identity.key) {
            (Some(set), Some(key)) => Some(root.entity_uri(set, key)),
            _ => None,
        }
    }

    /// Server address of the media stream, if it has a real identity.
    pub fn media_uri(&self, root: &ServiceRoot) -> Option<String> {
        if let Some(link) = &self.media_edit_link {
            return Some(root.resolve(link));
        }
        self.real_uri(root).map(|uri| format!("{}/$value", uri))
    }
}
