//! The entity context.

use crate::{AttachedEntityStatus, ContextError, ContextResult};
use log::debug;
use odsync_core::{EntityHandle, EntityIdentity, HandleId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone)]
struct Entry {
    handle: EntityHandle,
    status: AttachedEntityStatus,
}

/// Ordered registry of attached entities.
///
/// Iteration yields entries in attachment order. At most one handle is
/// registered per resolved [`EntityIdentity`].
#[derive(Debug, Default)]
pub struct EntityContext {
    entries: Vec<Entry>,
    index: HashMap<HandleId, usize>,
    by_identity: HashMap<EntityIdentity, HandleId>,
    deferred_deletes: Vec<String>,
    discarded: HashSet<HandleId>,
}

impl EntityContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handle with the given status.
    ///
    /// An already attached handle keeps its current status.
    pub fn attach(
        &mut self,
        handle: &EntityHandle,
        status: AttachedEntityStatus,
    ) -> ContextResult<()> {
        if self.index.contains_key(&handle.id()) {
            return Ok(());
        }
        let identity = handle.identity();
        if identity.is_resolved() {
            if let Some(existing) = self.by_identity.get(&identity) {
                return Err(ContextError::duplicate_identity(identity, *existing));
            }
            self.by_identity.insert(identity, handle.id());
        }
        self.discarded.remove(&handle.id());
        debug!("Attach {} as {}", handle, status);
        self.index.insert(handle.id(), self.entries.len());
        self.entries.push(Entry {
            handle: handle.clone(),
            status,
        });
        Ok(())
    }

    /// Override the status of an attached handle.
    pub fn set_status(
        &mut self,
        handle: &EntityHandle,
        status: AttachedEntityStatus,
    ) -> ContextResult<()> {
        let slot = *self
            .index
            .get(&handle.id())
            .ok_or_else(|| ContextError::not_attached(handle.id()))?;
        self.entries[slot].status = status;
        Ok(())
    }

    pub fn is_attached(&self, handle: &EntityHandle) -> bool {
        self.index.contains_key(&handle.id())
    }

    /// Status of a handle, `None` when not attached.
    pub fn status(&self, handle: &EntityHandle) -> Option<AttachedEntityStatus> {
        self.index
            .get(&handle.id())
            .map(|slot| self.entries[*slot].status)
    }

    /// Look up the handle registered for a resolved identity.
    pub fn get_by_identity(&self, identity: &EntityIdentity) -> Option<EntityHandle> {
        let id = self.by_identity.get(identity)?;
        self.index
            .get(id)
            .map(|slot| self.entries[*slot].handle.clone())
    }

    /// Refresh the identity index after a handle gained or changed its key.
    pub fn reindex(&mut self, handle: &EntityHandle) -> ContextResult<()> {
        if !self.is_attached(handle) {
            return Err(ContextError::not_attached(handle.id()));
        }
        let identity = handle.identity();
        if identity.is_resolved() {
            if let Some(existing) = self.by_identity.get(&identity) {
                if *existing != handle.id() {
                    return Err(ContextError::duplicate_identity(identity, *existing));
                }
                return Ok(());
            }
        }
        let id = handle.id();
        self.by_identity.retain(|_, owner| *owner != id);
        if identity.is_resolved() {
            self.by_identity.insert(identity, id);
        }
        Ok(())
    }

    /// Forget a handle; returns its last status.
    pub fn detach(&mut self, handle: &EntityHandle) -> Option<AttachedEntityStatus> {
        let slot = self.index.remove(&handle.id())?;
        let entry = self.entries.remove(slot);
        let id = handle.id();
        self.by_identity.retain(|_, owner| *owner != id);
        self.rebuild_index();
        Some(entry.status)
    }

    /// Drop a never-sent handle and remember that it was deleted.
    ///
    /// Links that still point at it are ignored until the handle is attached
    /// again.
    pub fn discard(&mut self, handle: &EntityHandle) -> Option<AttachedEntityStatus> {
        let status = self.detach(handle);
        self.discarded.insert(handle.id());
        status
    }

    pub fn is_discarded(&self, handle: &EntityHandle) -> bool {
        self.discarded.contains(&handle.id())
    }

    /// Forget every handle, deferred delete and discarded handle.
    pub fn detach_all(&mut self) {
        self.entries.clear();
        self.index.clear();
        self.by_identity.clear();
        self.deferred_deletes.clear();
        self.discarded.clear();
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&EntityHandle, AttachedEntityStatus) -> bool,
    {
        self.entries
            .retain(|entry| keep(&entry.handle, entry.status));
        let live: Vec<HandleId> = self.entries.iter().map(|e| e.handle.id()).collect();
        self.by_identity.retain(|_, owner| live.contains(owner));
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(slot, entry)| (entry.handle.id(), slot))
            .collect();
    }

    /// Iterate `(handle, status)` in attachment order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityHandle, AttachedEntityStatus)> {
        self.entries.iter().map(|entry| (&entry.handle, entry.status))
    }

    /// Owned copy of the entries, in attachment order.
    pub fn snapshot(&self) -> Vec<(EntityHandle, AttachedEntityStatus)> {
        self.entries
            .iter()
            .map(|entry| (entry.handle.clone(), entry.status))
            .collect()
    }

    /// Move dirty `ATTACHED`/`LINKED` handles to `CHANGED`.
    pub fn promote_dirty(&mut self) -> usize {
        let mut promoted = 0;
        for entry in &mut self.entries {
            if entry.status.is_clean_tracked() && entry.handle.is_changed() {
                debug!("Promote {} from {} to CHANGED", entry.handle, entry.status);
                entry.status = AttachedEntityStatus::Changed;
                promoted += 1;
            }
        }
        promoted
    }

    /// Schedule the deletion of an entity known only by URI.
    pub fn add_deferred_delete(&mut self, uri: impl Into<String>) {
        let uri = uri.into();
        if !self.deferred_deletes.contains(&uri) {
            self.deferred_deletes.push(uri);
        }
    }

    pub fn deferred_deletes(&self) -> &[String] {
        &self.deferred_deletes
    }

    /// Keep only the deferred deletes for which `keep` returns true.
    pub fn retain_deferred_deletes<F>(&mut self, keep: F)
    where
        F: FnMut(&String) -> bool,
    {
        self.deferred_deletes.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no handle and no deferred delete is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.deferred_deletes.is_empty()
    }
}
