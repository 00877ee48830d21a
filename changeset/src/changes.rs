//! Ordered change list and the changeset envelope.

use crate::WireRequest;
use odsync_core::{EntityHandle, Position};
use serde::Serialize;

/// Requests of one flush paired with their owning handle.
///
/// Insertion order is the wire order; the `i`-th entry has content-id `i`.
#[derive(Debug, Default)]
pub struct PersistenceChanges {
    entries: Vec<(WireRequest, Option<EntityHandle>)>,
}

impl PersistenceChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request; no reordering ever happens.
    pub fn add_change(&mut self, request: WireRequest, owner: Option<EntityHandle>) {
        self.entries.push((request, owner));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WireRequest, Option<&EntityHandle>)> {
        self.entries
            .iter()
            .map(|(request, owner)| (request, owner.as_ref()))
    }

    /// Entry at a content-id.
    pub fn get(&self, position: Position) -> Option<(&WireRequest, Option<&EntityHandle>)> {
        let (request, owner) = self.entries.get(position.index())?;
        Some((request, owner.as_ref()))
    }

    pub fn requests(&self) -> impl Iterator<Item = &WireRequest> {
        self.entries.iter().map(|(request, _)| request)
    }

    /// Build the envelope sent to the transport.
    pub fn to_changeset(&self) -> Changeset {
        Changeset {
            parts: self
                .entries
                .iter()
                .enumerate()
                .map(|(i, (request, _))| ChangesetPart {
                    content_id: i as u32 + 1,
                    request: request.clone(),
                })
                .collect(),
        }
    }
}

/// One part of a changeset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangesetPart {
    pub content_id: u32,
    pub request: WireRequest,
}

/// Atomic group of sub-requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Changeset {
    pub parts: Vec<ChangesetPart>,
}

impl Changeset {
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn part(&self, content_id: u32) -> Option<&ChangesetPart> {
        self.parts.iter().find(|part| part.content_id == content_id)
    }
}
