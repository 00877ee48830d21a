//! Handle/position index of one flush.

use odsync_core::{EntityHandle, Position};

/// Multimap from handles to the positions of their requests.
///
/// A handle is first registered with a `None` placeholder while it is being
/// compiled; `put` fills that placeholder and appends any further position.
#[derive(Debug, Default, Clone)]
pub struct TransactionItems {
    entries: Vec<(EntityHandle, Option<Position>)>,
}

impl TransactionItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `position` for `handle`.
    ///
    /// Replaces the handle's entry only while it is still the placeholder;
    /// otherwise appends a further entry.
    pub fn put(&mut self, handle: &EntityHandle, position: Option<Position>) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(owner, value)| owner == handle && value.is_none())
        {
            if position.is_some() {
                entry.1 = position;
            }
            return;
        }
        self.entries.push((handle.clone(), position));
    }

    pub fn contains(&self, handle: &EntityHandle) -> bool {
        self.entries.iter().any(|(owner, _)| owner == handle)
    }

    /// First position recorded for a handle.
    pub fn position_of(&self, handle: &EntityHandle) -> Option<Position> {
        self.entries
            .iter()
            .find(|(owner, _)| owner == handle)
            .and_then(|(_, position)| *position)
    }

    /// Every position recorded for a handle, in recording order.
    pub fn positions_of(&self, handle: &EntityHandle) -> Vec<Position> {
        self.entries
            .iter()
            .filter(|(owner, _)| owner == handle)
            .filter_map(|(_, position)| *position)
            .collect()
    }

    /// Owner of a position.
    pub fn handle_at(&self, position: Position) -> Option<&EntityHandle> {
        self.entries
            .iter()
            .find(|(_, value)| *value == Some(position))
            .map(|(owner, _)| owner)
    }

    /// Assigned positions, ascending.
    pub fn sorted_values(&self) -> Vec<Position> {
        let mut values: Vec<Position> = self.entries.iter().filter_map(|(_, p)| *p).collect();
        values.sort();
        values
    }

    /// Distinct handles, in registration order.
    pub fn handles(&self) -> Vec<EntityHandle> {
        let mut handles: Vec<EntityHandle> = Vec::new();
        for (owner, _) in &self.entries {
            if !handles.contains(owner) {
                handles.push(owner.clone());
            }
        }
        handles
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
