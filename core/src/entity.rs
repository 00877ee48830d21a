//! Entity handles.
//!
//! An [`EntityHandle`] is a shared reference to one locally tracked entity.
//! It carries the last known server state and buffers every pending change
//! (properties, instance annotations, navigation links, `$ref` additions and
//! stream bodies) until a flush reconciles them with the service.

use crate::{
    annotations, parse_entity_path, ChangeDescriptor, CoreError, CoreResult, EntityIdentity,
    EntityKey, EntityTypeDef, HandleId, IdentityKey, JsonMap, LinkChange, LinkTargets,
    ReferenceLink, ServiceRoot, StreamChange,
};
use log::debug;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Mutable state behind a handle.
#[derive(Debug)]
struct EntityState {
    type_def: Arc<EntityTypeDef>,
    entity_set: Option<String>,
    /// Key learned from the service (or given by the caller for a known entity).
    key: Option<EntityKey>,
    payload: JsonMap,
    edit_link: Option<String>,
    media_edit_link: Option<String>,
    etag: Option<String>,
    property_changes: JsonMap,
    annotations: JsonMap,
    /// Keyed by navigation declaration index.
    links: BTreeMap<usize, LinkChange>,
    references: Vec<ReferenceLink>,
    media: Option<StreamChange>,
    streams: BTreeMap<String, StreamChange>,
}

impl EntityState {
    fn new(type_def: Arc<EntityTypeDef>) -> Self {
        Self {
            type_def,
            entity_set: None,
            key: None,
            payload: JsonMap::new(),
            edit_link: None,
            media_edit_link: None,
            etag: None,
            property_changes: JsonMap::new(),
            annotations: JsonMap::new(),
            links: BTreeMap::new(),
            references: Vec::new(),
            media: None,
            streams: BTreeMap::new(),
        }
    }

    fn entity_set(&self) -> Option<String> {
        self.entity_set
            .clone()
            .or_else(|| self.type_def.entity_set.clone())
    }

    fn key(&self) -> Option<EntityKey> {
        if let Some(key) = &self.key {
            return Some(key.clone());
        }
        let mut merged = self.payload.clone();
        for (name, value) in &self.property_changes {
            merged.insert(name.clone(), value.clone());
        }
        EntityKey::from_payload(&self.type_def.key, &merged)
    }

    fn has_server_identity(&self) -> bool {
        self.edit_link.is_some() || self.key.is_some()
    }

    fn is_changed(&self) -> bool {
        !self.property_changes.is_empty()
            || !self.annotations.is_empty()
            || !self.links.is_empty()
            || !self.references.is_empty()
            || self.media.is_some()
            || !self.streams.is_empty()
    }

    /// Move `@odata.*` control information out of a server body.
    fn absorb_control_annotations(&mut self, body: &JsonMap) -> JsonMap {
        let mut payload = JsonMap::new();
        let mut id = None;
        for (name, value) in body {
            match name.as_str() {
                annotations::ODATA_EDIT_LINK => self.edit_link = value.as_str().map(String::from),
                annotations::ODATA_MEDIA_EDIT_LINK => {
                    self.media_edit_link = value.as_str().map(String::from)
                }
                annotations::ODATA_ETAG => self.etag = value.as_str().map(String::from),
                annotations::ODATA_ID => id = value.as_str().map(String::from),
                other if other.starts_with("@odata.") => {}
                _ => {
                    payload.insert(name.clone(), value.clone());
                }
            }
        }
        if self.edit_link.is_none() {
            self.edit_link = id;
        }
        payload
    }
}

/// Shared reference to one entity instance.
///
/// Cloning a handle yields another reference to the same entity; equality and
/// hashing are by [`HandleId`].
#[derive(Clone)]
pub struct EntityHandle {
    id: HandleId,
    state: Arc<RwLock<EntityState>>,
}

impl EntityHandle {
    /// Create a handle for an entity that does not exist on the service yet.
    pub fn new(type_def: Arc<EntityTypeDef>) -> Self {
        Self {
            id: HandleId::next(),
            state: Arc::new(RwLock::new(EntityState::new(type_def))),
        }
    }

    /// Create a handle from an entity read from the service.
    ///
    /// `@odata.editLink`, `@odata.id`, `@odata.mediaEditLink` and
    /// `@odata.etag` are lifted out of the body; the key is read from the
    /// declared key properties.
    pub fn loaded(type_def: Arc<EntityTypeDef>, body: JsonMap) -> Self {
        let handle = Self::new(type_def);
        {
            let mut state = handle.write();
            let payload = state.absorb_control_annotations(&body);
            state.key = EntityKey::from_payload(&state.type_def.key, &payload);
            state.payload = payload;
        }
        handle
    }

    /// Record initial property values as pending changes.
    pub fn with_properties(self, properties: JsonMap) -> Self {
        {
            let mut state = self.write();
            for (name, value) in properties {
                state.property_changes.insert(name, value);
            }
        }
        self
    }

    pub fn with_edit_link(self, edit_link: impl Into<String>) -> Self {
        self.write().edit_link = Some(edit_link.into());
        self
    }

    pub fn with_media_edit_link(self, media_edit_link: impl Into<String>) -> Self {
        self.write().media_edit_link = Some(media_edit_link.into());
        self
    }

    pub fn with_etag(self, etag: impl Into<String>) -> Self {
        self.write().etag = Some(etag.into());
        self
    }

    /// Declare the server key of an entity known to exist.
    pub fn with_key(self, key: impl Into<EntityKey>) -> Self {
        self.write().key = Some(key.into());
        self
    }

    pub fn with_entity_set(self, entity_set: impl Into<String>) -> Self {
        self.assign_entity_set(entity_set);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, EntityState> {
        self.state.read().expect("entity state lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, EntityState> {
        self.state.write().expect("entity state lock poisoned")
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn type_def(&self) -> Arc<EntityTypeDef> {
        self.read().type_def.clone()
    }

    pub fn type_name(&self) -> String {
        self.read().type_def.name.clone()
    }

    /// Entity set: explicitly assigned, else the type's default.
    pub fn entity_set(&self) -> Option<String> {
        self.read().entity_set()
    }

    /// Set the entity set of an entity that has none.
    pub fn assign_entity_set(&self, entity_set: impl Into<String>) {
        self.write().entity_set = Some(entity_set.into());
    }

    /// Drop an explicitly assigned entity set; the type's default applies again.
    pub fn unassign_entity_set(&self) {
        self.write().entity_set = None;
    }

    /// Key: server-known, else derived from payload and pending changes.
    pub fn key(&self) -> Option<EntityKey> {
        self.read().key()
    }

    pub fn identity(&self) -> EntityIdentity {
        let state = self.read();
        EntityIdentity::new(state.entity_set(), state.type_def.name.clone(), state.key())
    }

    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::of(self.identity(), self.id)
    }

    /// Returns true if the entity is known to exist on the service.
    pub fn has_server_identity(&self) -> bool {
        self.read().has_server_identity()
    }

    pub fn edit_link(&self) -> Option<String> {
        self.read().edit_link.clone()
    }

    pub fn media_edit_link(&self) -> Option<String> {
        self.read().media_edit_link.clone()
    }

    pub fn etag(&self) -> Option<String> {
        self.read().etag.clone()
    }

    /// Last known server state.
    pub fn payload(&self) -> JsonMap {
        self.read().payload.clone()
    }

    pub fn property_changes(&self) -> JsonMap {
        self.read().property_changes.clone()
    }

    pub fn annotations(&self) -> JsonMap {
        self.read().annotations.clone()
    }

    /// Current value of a property: pending change first, then server state.
    pub fn property(&self, name: &str) -> Option<JsonValue> {
        let state = self.read();
        state
            .property_changes
            .get(name)
            .or_else(|| state.payload.get(name))
            .cloned()
    }

    /// Pending link change on a navigation property.
    pub fn link_change(&self, property: &str) -> Option<LinkChange> {
        let state = self.read();
        let (index, _) = state.type_def.navigation_property(property)?;
        state.links.get(&index).cloned()
    }

    pub fn references(&self) -> Vec<ReferenceLink> {
        self.read().references.clone()
    }

    pub fn media_change(&self) -> Option<StreamChange> {
        self.read().media.clone()
    }

    pub fn stream_change(&self, property: &str) -> Option<StreamChange> {
        self.read().streams.get(property).cloned()
    }

    /// Returns true if anything is pending on this entity.
    pub fn is_changed(&self) -> bool {
        self.read().is_changed()
    }

    /// Server address from the edit link or a server-known key.
    pub fn persisted_uri(&self, root: &ServiceRoot) -> Option<String> {
        let state = self.read();
        if let Some(link) = &state.edit_link {
            return Some(root.resolve(link));
        }
        match (state.entity_set(), &state.key) {
            (Some(set), Some(key)) => Some(root.entity_uri(&set, key)),
            _ => None,
        }
    }

    /// Address for delete requests: edit link, else entity set plus key.
    pub fn entity_uri(&self, root: &ServiceRoot) -> CoreResult<String> {
        let state = self.read();
        if let Some(link) = &state.edit_link {
            return Ok(root.resolve(link));
        }
        let set = state
            .entity_set()
            .ok_or_else(|| CoreError::missing_entity_set(&state.type_def.name))?;
        let key = state
            .key()
            .ok_or_else(|| CoreError::missing_key(&state.type_def.name))?;
        Ok(root.entity_uri(&set, &key))
    }

    pub fn set_property(&self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.write()
            .property_changes
            .insert(name.into(), value.into());
    }

    /// Record an instance annotation (`@Namespace.Term`).
    pub fn set_annotation(&self, term: impl Into<String>, value: impl Into<JsonValue>) {
        let mut term = term.into();
        if !term.starts_with('@') {
            term.insert(0, '@');
        }
        self.write().annotations.insert(term, value.into());
    }

    /// Resolve a navigation property and check every target against it.
    fn check_link(
        &self,
        property: &str,
        collection: bool,
        targets: &[EntityHandle],
    ) -> CoreResult<(usize, crate::NavigationProperty)> {
        let type_def = self.type_def();
        let (index, nav) = type_def
            .navigation_property(property)
            .ok_or_else(|| CoreError::unknown_navigation(&type_def.name, property))?;
        if nav.collection != collection {
            return Err(CoreError::cardinality_mismatch(property, nav.collection));
        }
        for target in targets {
            // The target lock is released before `self` is locked for writing.
            let target_def = target.type_def();
            if !target_def.is_assignable_to(&nav.target_type) {
                return Err(CoreError::link_target_type_mismatch(
                    property,
                    &nav.target_type,
                    &target_def.name,
                ));
            }
        }
        Ok((index, nav.clone()))
    }

    /// Point a single-valued navigation at `target`.
    pub fn set_link(&self, property: &str, target: &EntityHandle) -> CoreResult<()> {
        let (index, nav) = self.check_link(property, false, std::slice::from_ref(target))?;
        self.write().links.insert(
            index,
            LinkChange {
                property: nav,
                targets: LinkTargets::Single(target.clone()),
            },
        );
        Ok(())
    }

    /// Add `target` to a collection navigation; duplicates are ignored.
    pub fn add_link(&self, property: &str, target: &EntityHandle) -> CoreResult<()> {
        let (index, nav) = self.check_link(property, true, std::slice::from_ref(target))?;
        let mut state = self.write();
        let change = state.links.entry(index).or_insert_with(|| LinkChange {
            property: nav,
            targets: LinkTargets::Collection(Vec::new()),
        });
        if let LinkTargets::Collection(handles) = &mut change.targets {
            if !handles.contains(target) {
                handles.push(target.clone());
            }
        }
        Ok(())
    }

    /// Replace the pending targets of a collection navigation.
    pub fn set_links(&self, property: &str, targets: Vec<EntityHandle>) -> CoreResult<()> {
        let (index, nav) = self.check_link(property, true, &targets)?;
        let mut unique: Vec<EntityHandle> = Vec::with_capacity(targets.len());
        for target in targets {
            if !unique.contains(&target) {
                unique.push(target);
            }
        }
        self.write().links.insert(
            index,
            LinkChange {
                property: nav,
                targets: LinkTargets::Collection(unique),
            },
        );
        Ok(())
    }

    /// Add an entity known only by URI to a collection navigation (`$ref`).
    pub fn add_reference(&self, property: &str, uri: impl Into<String>) -> CoreResult<()> {
        self.check_link(property, true, &[])?;
        let reference = ReferenceLink {
            property: property.to_string(),
            uri: uri.into(),
        };
        let mut state = self.write();
        if !state.references.contains(&reference) {
            state.references.push(reference);
        }
        Ok(())
    }

    /// Replace the media stream of a media entity.
    pub fn set_media_stream(
        &self,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> CoreResult<()> {
        let mut state = self.write();
        if !state.type_def.has_stream {
            return Err(CoreError::not_media_entity(&state.type_def.name));
        }
        state.media = Some(StreamChange::new(content_type, bytes));
        Ok(())
    }

    /// Replace the content of a named stream property.
    pub fn set_stream_property(
        &self,
        property: &str,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> CoreResult<()> {
        let mut state = self.write();
        if !state.type_def.has_stream_property(property) {
            return Err(CoreError::unknown_stream(&state.type_def.name, property));
        }
        state
            .streams
            .insert(property.to_string(), StreamChange::new(content_type, bytes));
        Ok(())
    }

    /// Snapshot of the pending changes and addressing data.
    pub fn change_descriptor(&self) -> ChangeDescriptor {
        let state = self.read();
        ChangeDescriptor {
            handle: self.id,
            identity: EntityIdentity::new(
                state.entity_set(),
                state.type_def.name.clone(),
                state.key(),
            ),
            edit_link: state.edit_link.clone(),
            media_edit_link: state.media_edit_link.clone(),
            etag: state.etag.clone(),
            persisted: state.has_server_identity(),
            is_media_entity: state.type_def.has_stream,
            payload: state.payload.clone(),
            property_changes: state.property_changes.clone(),
            annotations: state.annotations.clone(),
            links: state.links.values().cloned().collect(),
            references: state.references.clone(),
            media: state.media.clone(),
            streams: state
                .streams
                .iter()
                .map(|(name, change)| (name.clone(), change.clone()))
                .collect(),
        }
    }

    /// Apply a successful create or update response.
    ///
    /// A body replaces the payload; without one the sent property changes are
    /// folded into it. `location` and `etag` come from response headers.
    /// Property, annotation, link and reference buffers are cleared; stream
    /// buffers are left to their own responses.
    pub fn apply_server_entity(
        &self,
        body: Option<&JsonMap>,
        location: Option<&str>,
        etag: Option<&str>,
    ) {
        let mut state = self.write();
        match body {
            Some(body) => {
                let payload = state.absorb_control_annotations(body);
                state.payload = payload;
            }
            None => {
                let changes = std::mem::take(&mut state.property_changes);
                for (name, value) in changes {
                    state.payload.insert(name, value);
                }
            }
        }
        if let Some(location) = location {
            state.edit_link = Some(location.to_string());
            if state.key.is_none() {
                let path = location.rsplit('/').next().unwrap_or(location);
                if let Some((set, key)) = parse_entity_path(path) {
                    if state.entity_set.is_none() {
                        state.entity_set = Some(set);
                    }
                    state.key = Some(key);
                }
            }
        }
        if let Some(etag) = etag {
            state.etag = Some(etag.to_string());
        }
        if state.key.is_none() {
            state.key = EntityKey::from_payload(&state.type_def.key, &state.payload);
        }
        state.property_changes.clear();
        state.annotations.clear();
        state.links.clear();
        state.references.clear();
        debug!(
            "Reconciled {} {} (key: {:?})",
            state.type_def.name, self.id, state.key
        );
    }

    /// Put back link and reference changes whose requests did not go through.
    ///
    /// Links already pending on the same navigation are kept as they are.
    pub fn requeue_links(&self, links: &[LinkChange], references: &[ReferenceLink]) {
        let mut state = self.write();
        for link in links {
            let index = match state.type_def.navigation_property(&link.property.name) {
                Some((index, _)) => index,
                None => continue,
            };
            state.links.entry(index).or_insert_with(|| link.clone());
        }
        for reference in references {
            if !state.references.contains(reference) {
                state.references.push(reference.clone());
            }
        }
    }

    pub fn clear_media_change(&self) {
        self.write().media = None;
    }

    pub fn clear_stream_change(&self, property: &str) {
        self.write().streams.remove(property);
    }

    /// Drop every pending change.
    pub fn clear_changes(&self) {
        let mut state = self.write();
        state.property_changes.clear();
        state.annotations.clear();
        state.links.clear();
        state.references.clear();
        state.media = None;
        state.streams.clear();
    }
}

impl PartialEq for EntityHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityHandle {}

impl Hash for EntityHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EntityHandle {
    // Link targets are handles themselves; printing state could recurse.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityHandle")
            .field("id", &self.id)
            .field("type", &self.type_name())
            .finish()
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.identity(), self.id)
    }
}
