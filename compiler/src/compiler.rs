//! Dependency compiler.

use crate::{
    CompileError, CompileResult, DelayedLink, DelayedLinkResolver, PositionCounter,
    TransactionItems,
};
use log::debug;
use odsync_changeset::{EntityPayload, PersistenceChanges, RequestKind, WireRequest};
use odsync_context::{AttachedEntityStatus, EntityContext};
use odsync_core::annotations::{IF_MATCH, PREFER, RETURN_REPRESENTATION};
use odsync_core::{
    ChangeDescriptor, CoreError, EntityHandle, NavigationProperty, Position, ServiceRoot,
};

/// Settings that shape the generated requests.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub service_root: ServiceRoot,
    /// Ask for the updated entity in PATCH responses.
    pub prefer_return_content: bool,
}

impl CompileOptions {
    pub fn new(service_root: ServiceRoot) -> Self {
        Self {
            service_root,
            prefer_return_content: false,
        }
    }

    pub fn with_prefer_return_content(mut self, prefer: bool) -> Self {
        self.prefer_return_content = prefer;
        self
    }
}

/// Output of one compilation.
#[derive(Debug, Default)]
pub struct CompiledFlush {
    pub changes: PersistenceChanges,
    pub items: TransactionItems,
}

impl CompiledFlush {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Compile every pending change of `context`.
pub fn compile(
    context: &mut EntityContext,
    options: &CompileOptions,
) -> CompileResult<CompiledFlush> {
    DependencyCompiler::new(context, options).compile_context()
}

/// Walks the entity graph and queues requests in dependency order.
pub struct DependencyCompiler<'a> {
    context: &'a mut EntityContext,
    options: &'a CompileOptions,
    /// Link targets attached during this compilation, and whether they were
    /// given the navigation's entity set.
    enrolled: Vec<(EntityHandle, bool)>,
}

impl<'a> DependencyCompiler<'a> {
    pub fn new(context: &'a mut EntityContext, options: &'a CompileOptions) -> Self {
        Self {
            context,
            options,
            enrolled: Vec::new(),
        }
    }

    /// Compile the whole context: the primary pass in attachment order, then
    /// delayed links, then deletes by URI.
    ///
    /// On error the link targets attached along the way are detached again,
    /// so a failed compilation leaves the context as it found it.
    pub fn compile_context(mut self) -> CompileResult<CompiledFlush> {
        let result = self.compile_all();
        if result.is_err() {
            self.roll_back();
        }
        result
    }

    fn roll_back(&mut self) {
        for (target, assigned) in self.enrolled.drain(..).rev() {
            debug!("Roll back attachment of '{}'", target);
            self.context.detach(&target);
            if assigned {
                target.unassign_entity_set();
            }
        }
    }

    fn compile_all(&mut self) -> CompileResult<CompiledFlush> {
        let mut counter = PositionCounter::new();
        let mut items = TransactionItems::new();
        let mut delayed = Vec::new();
        let mut changes = PersistenceChanges::new();

        // Primary pass over a snapshot; targets attached on the way are
        // compiled through recursion.
        for (handle, status) in self.context.snapshot() {
            if (!status.is_clean_tracked() || handle.is_changed()) && !items.contains(&handle) {
                counter.advance();
                self.compile(&handle, &mut counter, &mut items, &mut delayed, &mut changes)?;
            }
        }

        DelayedLinkResolver::new(&*self.context, self.options).resolve(
            delayed,
            &mut counter,
            &mut items,
            &mut changes,
        )?;

        // Deletes of entities known only by URI come last and own no item.
        for uri in self.context.deferred_deletes() {
            let position = counter.advance();
            debug!("{}: Delete '{}'", position, uri);
            changes.add_change(WireRequest::delete(uri.clone()), None);
        }

        Ok(CompiledFlush { changes, items })
    }

    /// Compile one entity (and, first, any dirty entity it links to).
    ///
    /// On entry `counter` holds the position this entity's primary request
    /// takes; on return it holds the last position consumed. When nothing is
    /// queued the position is given back.
    pub fn compile(
        &mut self,
        handle: &EntityHandle,
        counter: &mut PositionCounter,
        items: &mut TransactionItems,
        delayed: &mut Vec<DelayedLink>,
        changes: &mut PersistenceChanges,
    ) -> CompileResult<Position> {
        items.put(handle, None);
        let status = self
            .context
            .status(handle)
            .ok_or_else(|| odsync_context::ContextError::not_attached(handle.id()))?;
        let descriptor = handle.change_descriptor();
        debug!("Process '{}' ({})", handle, status);

        let mut payload = if status == AttachedEntityStatus::Deleted {
            EntityPayload::new()
        } else {
            outgoing_payload(&descriptor, status)
        };

        for link in &descriptor.links {
            let collection = link.targets.is_collection();
            let mut to_be_linked = Vec::new();

            for target in link.targets.iter() {
                if self.context.is_discarded(target) {
                    debug!(
                        "Drop '{}' from '{}' to discarded '{}'",
                        link.property.name, handle, target
                    );
                    continue;
                }
                let target_status = match self.context.status(target) {
                    Some(target_status) => target_status,
                    None => self.attach_link_target(&link.property, target)?,
                };
                debug!("Found link to '{}' ({})", target, target_status);

                if target_status.is_clean_tracked() && !target.is_changed() {
                    let uri = target
                        .persisted_uri(&self.options.service_root)
                        .ok_or_else(|| CompileError::unresolved_address(target.id()))?;
                    debug!("Add link to '{}'", uri);
                    payload.bind(&link.property.name, collection, uri);
                    continue;
                }

                if !items.contains(target) {
                    self.compile(target, counter, items, delayed, changes)?;
                    counter.advance();
                }

                match items.position_of(target) {
                    None => {
                        debug!(
                            "Schedule '{}' from '{}' to '{}'",
                            link.property.name, handle, target
                        );
                        to_be_linked.push(target.clone());
                    }
                    Some(position) => {
                        let real = (target_status == AttachedEntityStatus::Changed)
                            .then(|| target.persisted_uri(&self.options.service_root))
                            .flatten();
                        let uri = real.unwrap_or_else(|| position.reference());
                        debug!(
                            "'{}' from '{}' to ({}) '{}'",
                            link.property.name, handle, position, uri
                        );
                        payload.bind(&link.property.name, collection, uri);
                    }
                }
            }

            if !to_be_linked.is_empty() {
                delayed.push(DelayedLink::Bind {
                    property: link.property.clone(),
                    source: handle.clone(),
                    targets: to_be_linked,
                });
            }
        }

        for reference in &descriptor.references {
            delayed.push(DelayedLink::Reference {
                property: reference.property.clone(),
                source: handle.clone(),
                uri: reference.uri.clone(),
            });
        }

        let position = counter.current();
        let request = self.primary_request(handle, &descriptor, status, payload)?;
        let request = match request {
            Some(request) => request,
            None => {
                debug!("Nothing to send for '{}'", handle);
                counter.retreat();
                return Ok(counter.current());
            }
        };

        debug!("{}: Insert '{}' into the changeset", position, request);
        changes.add_change(request, Some(handle.clone()));
        items.put(handle, Some(position));

        if status != AttachedEntityStatus::Deleted && descriptor.has_stream_changes() {
            self.queue_streams(handle, &descriptor, status, position, counter, items, changes)?;
        }

        Ok(counter.current())
    }

    /// Attach a target that was only reachable through a link.
    fn attach_link_target(
        &mut self,
        property: &NavigationProperty,
        target: &EntityHandle,
    ) -> CompileResult<AttachedEntityStatus> {
        let mut assigned = false;
        let status = if target.has_server_identity() {
            AttachedEntityStatus::Linked
        } else {
            if target.entity_set().is_none() {
                if let Some(set) = &property.target_entity_set {
                    target.assign_entity_set(set.clone());
                    assigned = true;
                }
            }
            AttachedEntityStatus::New
        };
        if let Err(err) = self.context.attach(target, status) {
            if assigned {
                target.unassign_entity_set();
            }
            return Err(err.into());
        }
        self.enrolled.push((target.clone(), assigned));
        Ok(status)
    }

    fn primary_request(
        &self,
        handle: &EntityHandle,
        descriptor: &ChangeDescriptor,
        status: AttachedEntityStatus,
        payload: EntityPayload,
    ) -> CompileResult<Option<WireRequest>> {
        let root = &self.options.service_root;
        let request = match status {
            AttachedEntityStatus::New => {
                let set = descriptor
                    .identity
                    .entity_set
                    .as_deref()
                    .ok_or_else(|| CoreError::missing_entity_set(&descriptor.identity.type_name))?;
                WireRequest::create(root.entity_set_uri(set), payload)
            }
            AttachedEntityStatus::Deleted => {
                let request = WireRequest::delete(handle.entity_uri(root)?);
                with_if_match(request, descriptor)
            }
            AttachedEntityStatus::Changed => self.update_request(handle, descriptor, payload)?,
            AttachedEntityStatus::Attached | AttachedEntityStatus::Linked => {
                if !descriptor.is_changed() {
                    return Ok(None);
                }
                self.update_request(handle, descriptor, payload)?
            }
        };
        Ok(Some(request))
    }

    fn update_request(
        &self,
        handle: &EntityHandle,
        descriptor: &ChangeDescriptor,
        payload: EntityPayload,
    ) -> CompileResult<WireRequest> {
        let mut request = WireRequest::update(handle.entity_uri(&self.options.service_root)?, payload);
        request = with_if_match(request, descriptor);
        if self.options.prefer_return_content {
            request = request.header(PREFER, RETURN_REPRESENTATION);
        }
        Ok(request)
    }

    /// Queue one request per pending stream, each at a further position.
    #[allow(clippy::too_many_arguments)]
    fn queue_streams(
        &self,
        handle: &EntityHandle,
        descriptor: &ChangeDescriptor,
        status: AttachedEntityStatus,
        primary: Position,
        counter: &mut PositionCounter,
        items: &mut TransactionItems,
        changes: &mut PersistenceChanges,
    ) -> CompileResult<()> {
        let root = &self.options.service_root;
        let created = status == AttachedEntityStatus::New;

        if let Some(media) = &descriptor.media {
            let uri = if created {
                primary.value_reference()
            } else {
                match descriptor.media_uri(root) {
                    Some(uri) => uri,
                    None => format!("{}/$value", handle.entity_uri(root)?),
                }
            };
            let position = counter.advance();
            let request = with_if_match(
                WireRequest::stream(
                    uri,
                    RequestKind::MediaUpdate,
                    media.content_type.clone(),
                    media.bytes.clone(),
                ),
                descriptor,
            );
            debug!("{}: Insert '{}' into the changeset", position, request);
            changes.add_change(request, Some(handle.clone()));
            items.put(handle, Some(position));
        }

        for (name, stream) in &descriptor.streams {
            let uri = if created {
                primary.sub_reference(name)
            } else {
                format!("{}/{}", handle.entity_uri(root)?, name)
            };
            let position = counter.advance();
            let request = with_if_match(
                WireRequest::stream(
                    uri,
                    RequestKind::StreamUpdate(name.clone()),
                    stream.content_type.clone(),
                    stream.bytes.clone(),
                ),
                descriptor,
            );
            debug!("{}: Insert '{}' into the changeset", position, request);
            changes.add_change(request, Some(handle.clone()));
            items.put(handle, Some(position));
        }
        Ok(())
    }
}

/// Properties and annotations sent with the primary request.
fn outgoing_payload(descriptor: &ChangeDescriptor, status: AttachedEntityStatus) -> EntityPayload {
    let properties = if status == AttachedEntityStatus::New {
        let mut merged = descriptor.payload.clone();
        for (name, value) in &descriptor.property_changes {
            merged.insert(name.clone(), value.clone());
        }
        merged
    } else {
        descriptor.property_changes.clone()
    };
    EntityPayload::with_properties(properties, descriptor.annotations.clone())
}

fn with_if_match(request: WireRequest, descriptor: &ChangeDescriptor) -> WireRequest {
    match &descriptor.etag {
        Some(etag) => request.header(IF_MATCH, etag.clone()),
        None => request,
    }
}
