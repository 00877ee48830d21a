//! Second pass: links that could not be bound inline.

use crate::{CompileError, CompileOptions, CompileResult, PositionCounter, TransactionItems};
use log::debug;
use odsync_changeset::{EntityPayload, PersistenceChanges, WireRequest};
use odsync_context::{AttachedEntityStatus, EntityContext};
use odsync_core::{EntityHandle, NavigationProperty};

/// A link queued during the primary pass.
#[derive(Debug, Clone)]
pub enum DelayedLink {
    /// Bind `targets` to `property` of `source` once all positions are known.
    Bind {
        property: NavigationProperty,
        source: EntityHandle,
        targets: Vec<EntityHandle>,
    },
    /// Add an entity known by URI to a collection of `source` via `$ref`.
    Reference {
        property: String,
        source: EntityHandle,
        uri: String,
    },
}

impl DelayedLink {
    pub fn source(&self) -> &EntityHandle {
        match self {
            DelayedLink::Bind { source, .. } | DelayedLink::Reference { source, .. } => source,
        }
    }
}

/// Emits one follow-up request per delayed link.
pub struct DelayedLinkResolver<'a> {
    context: &'a EntityContext,
    options: &'a CompileOptions,
}

impl<'a> DelayedLinkResolver<'a> {
    pub fn new(context: &'a EntityContext, options: &'a CompileOptions) -> Self {
        Self { context, options }
    }

    /// Queue the follow-up requests in the order the links were delayed.
    pub fn resolve(
        &self,
        delayed: Vec<DelayedLink>,
        counter: &mut PositionCounter,
        items: &mut TransactionItems,
        changes: &mut PersistenceChanges,
    ) -> CompileResult<()> {
        for link in delayed {
            let source_uri = self.address(link.source(), items)?;
            let position = counter.advance();
            let request = match &link {
                DelayedLink::Bind {
                    property, targets, ..
                } => {
                    let mut payload = EntityPayload::new();
                    for target in targets {
                        let target_uri = self.address(target, items)?;
                        debug!(
                            "'{}' from {} to {}",
                            property.name, source_uri, target_uri
                        );
                        payload.bind(&property.name, property.collection, target_uri);
                    }
                    WireRequest::link_update(source_uri, payload)
                }
                DelayedLink::Reference { property, uri, .. } => {
                    debug!("'{}' from {} to {} via $ref", property, source_uri, uri);
                    WireRequest::reference_add(&source_uri, property, uri.clone())
                }
            };
            debug!("{}: Insert '{}' into the changeset", position, request);
            changes.add_change(request, Some(link.source().clone()));
            items.put(link.source(), Some(position));
        }
        Ok(())
    }

    /// Real address for a `CHANGED` entity with identity, else `$<first position>`.
    fn address(&self, handle: &EntityHandle, items: &TransactionItems) -> CompileResult<String> {
        if self.context.status(handle) == Some(AttachedEntityStatus::Changed) {
            if let Some(uri) = handle.persisted_uri(&self.options.service_root) {
                return Ok(uri);
            }
        }
        items
            .position_of(handle)
            .map(|position| position.reference())
            .ok_or_else(|| CompileError::unresolved_address(handle.id()))
    }
}
