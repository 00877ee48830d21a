//! Best-effort execution, one request at a time.
//!
//! Requests go out in position order. `$n` references are rewritten with
//! the address learned from the response at position `n`; a request whose
//! reference cannot be resolved is skipped. Failures do not stop the run,
//! cancellation does.

use crate::{
    apply_response, ExecutorError, FlushReport, RequestFailure, SubmitPolicy, Transport,
    WireResponse,
};
use log::{debug, error, info, warn};
use odsync_changeset::{RequestKind, WireRequest};
use odsync_compiler::CompiledFlush;
use odsync_context::{AttachedEntityStatus, EntityContext};
use odsync_core::annotations::{ODATA_EDIT_LINK, ODATA_ID};
use odsync_core::{ChangeDescriptor, EntityHandle, EntityKey, HandleId, Position, ServiceRoot};
use std::collections::{HashMap, HashSet};

/// What happened to one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Succeeded(WireResponse),
    /// `status` is `None` when no response came back.
    Failed { status: Option<u16>, message: String },
    Skipped { reason: String },
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Succeeded(_))
    }
}

/// Outcomes in position order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionLog {
    pub outcomes: Vec<RequestOutcome>,
    pub cancelled: bool,
}

impl SubmissionLog {
    pub fn outcome(&self, position: Position) -> Option<&RequestOutcome> {
        self.outcomes.get(position.index())
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
}

pub struct NonTransactionalExecutor<'t, T: Transport + ?Sized> {
    transport: &'t T,
    policy: SubmitPolicy,
    root: ServiceRoot,
}

impl<'t, T: Transport + ?Sized> NonTransactionalExecutor<'t, T> {
    pub fn new(transport: &'t T, policy: SubmitPolicy, root: ServiceRoot) -> Self {
        Self {
            transport,
            policy,
            root,
        }
    }

    /// Send every request, collecting one outcome per position.
    pub async fn submit(&self, flush: &CompiledFlush) -> SubmissionLog {
        let mut log = SubmissionLog::default();
        let mut learned: HashMap<Position, String> = HashMap::new();

        for (index, (request, owner)) in flush.changes.iter().enumerate() {
            let position = Position::new(index as u32 + 1);
            if log.cancelled {
                log.outcomes.push(RequestOutcome::Skipped {
                    reason: "flush cancelled".to_string(),
                });
                continue;
            }

            let resolved = match request.resolve_references(|p| learned.get(&p).cloned()) {
                Ok(resolved) => resolved,
                Err(missing) => {
                    warn!(
                        "{}: Skipping '{}', {} did not produce an address",
                        position, request, missing
                    );
                    log.outcomes.push(RequestOutcome::Skipped {
                        reason: format!("unresolved reference {}", missing),
                    });
                    continue;
                }
            };

            debug!("{}: Execute '{}'", position, resolved);
            let outcome = match self.policy.run(self.transport.execute(&resolved)).await {
                Ok(response) if !response.is_failure() => {
                    if let Some(uri) = self.learned_uri(&resolved, owner, &response) {
                        learned.insert(position, uri);
                    }
                    RequestOutcome::Succeeded(response)
                }
                Ok(response) => {
                    let message = response.error_message();
                    error!(
                        "{}: '{}' failed with {}: {}",
                        position, resolved, response.status, message
                    );
                    RequestOutcome::Failed {
                        status: Some(response.status),
                        message,
                    }
                }
                Err(ExecutorError::Cancelled) => {
                    warn!("{}: Flush cancelled before '{}' completed", position, resolved);
                    log.cancelled = true;
                    RequestOutcome::Skipped {
                        reason: "flush cancelled".to_string(),
                    }
                }
                Err(err) => {
                    error!("{}: '{}' failed: {}", position, resolved, err);
                    RequestOutcome::Failed {
                        status: None,
                        message: err.to_string(),
                    }
                }
            };
            log.outcomes.push(outcome);
        }
        log
    }

    /// Apply what succeeded and keep what did not.
    ///
    /// Handles with any failed or skipped request stay attached and keep
    /// their unsent changes. Everything else is detached.
    pub fn reconcile(
        &self,
        flush: &CompiledFlush,
        log: &SubmissionLog,
        context: &mut EntityContext,
    ) -> FlushReport {
        let mut report = FlushReport::new(flush.changes.len());
        report.cancelled = log.cancelled;

        let mut failed: HashSet<HandleId> = HashSet::new();
        let mut failed_deletes: HashSet<String> = HashSet::new();
        let mut created: HashSet<HandleId> = HashSet::new();

        for (index, (request, owner)) in flush.changes.iter().enumerate() {
            let content_id = index as u32 + 1;
            let (status, message) = match log.outcomes.get(index) {
                Some(RequestOutcome::Succeeded(_)) => {
                    report.succeeded += 1;
                    if let (RequestKind::Create, Some(owner)) = (&request.kind, owner) {
                        created.insert(owner.id());
                    }
                    continue;
                }
                Some(RequestOutcome::Failed { status, message }) => (*status, message.clone()),
                Some(RequestOutcome::Skipped { reason }) => (None, reason.clone()),
                None => (None, "not submitted".to_string()),
            };
            match owner {
                Some(owner) => {
                    failed.insert(owner.id());
                }
                None if request.kind == RequestKind::Delete => {
                    failed_deletes.insert(request.uri.clone());
                }
                None => {}
            }
            report.failures.push(RequestFailure {
                content_id,
                method: request.method,
                uri: request.uri.clone(),
                status,
                message,
                handle: owner.map(EntityHandle::id),
            });
        }

        // Links of failed handles must survive the successful responses.
        let snapshots: Vec<(EntityHandle, ChangeDescriptor)> = flush
            .items
            .handles()
            .into_iter()
            .filter(|h| failed.contains(&h.id()))
            .map(|h| {
                let descriptor = h.change_descriptor();
                (h, descriptor)
            })
            .collect();

        for position in flush.items.sorted_values() {
            let (Some(handle), Some((request, _)), Some(RequestOutcome::Succeeded(response))) = (
                flush.items.handle_at(position),
                flush.changes.get(position),
                log.outcome(position),
            ) else {
                continue;
            };
            apply_response(handle, &request.kind, response);
        }

        for (handle, descriptor) in &snapshots {
            let unsent_links = flush.changes.iter().enumerate().any(|(index, (req, owner))| {
                matches!(req.kind, RequestKind::LinkUpdate | RequestKind::ReferenceAdd)
                    && owner.map(EntityHandle::id) == Some(handle.id())
                    && !matches!(log.outcomes.get(index), Some(RequestOutcome::Succeeded(_)))
            });
            if unsent_links {
                handle.requeue_links(&descriptor.links, &descriptor.references);
            }
        }

        let before = context.len();
        context.retain(|handle, _| failed.contains(&handle.id()));
        report.detached = before - context.len();
        report.retained = context.len();

        for (handle, status) in context.snapshot() {
            if status == AttachedEntityStatus::New && created.contains(&handle.id()) {
                if let Err(err) = context.set_status(&handle, AttachedEntityStatus::Changed) {
                    warn!("Could not update status of '{}': {}", handle, err);
                }
            }
            if let Err(err) = context.reindex(&handle) {
                warn!("Could not reindex '{}': {}", handle, err);
            }
        }
        context.retain_deferred_deletes(|uri| failed_deletes.contains(uri));

        info!(
            "Flush finished: {} of {} requests succeeded, {} detached, {} retained",
            report.succeeded, report.submitted, report.detached, report.retained
        );
        report
    }

    /// Submit and reconcile.
    pub async fn execute(&self, flush: &CompiledFlush, context: &mut EntityContext) -> FlushReport {
        let log = self.submit(flush).await;
        self.reconcile(flush, &log, context)
    }

    /// Address a later `$n` reference should resolve to.
    fn learned_uri(
        &self,
        request: &WireRequest,
        owner: Option<&EntityHandle>,
        response: &WireResponse,
    ) -> Option<String> {
        match request.kind {
            RequestKind::Create => {
                if let Some(location) = response.location() {
                    return Some(self.root.resolve(location));
                }
                let body = response.body.as_ref()?;
                if let Some(link) = body
                    .get(ODATA_EDIT_LINK)
                    .or_else(|| body.get(ODATA_ID))
                    .and_then(|v| v.as_str())
                {
                    return Some(self.root.resolve(link));
                }
                let owner = owner?;
                let entity_set = owner.entity_set()?;
                let key = EntityKey::from_payload(&owner.type_def().key, body)?;
                Some(self.root.entity_uri(&entity_set, &key))
            }
            RequestKind::Update | RequestKind::LinkUpdate => Some(request.uri.clone()),
            _ => None,
        }
    }
}
