//! The unit of work.

use crate::{
    ExecutionMode, FlushLease, FlushState, FlushTracker, ServiceConfig, SessionError,
    SessionResult,
};
use log::{debug, info};
use odsync_compiler::{compile, CompileOptions};
use odsync_context::{AttachedEntityStatus, EntityContext};
use odsync_core::{EntityHandle, EntityIdentity, ServiceRoot};
use odsync_executor::{
    CancelToken, FlushReport, NonTransactionalExecutor, SubmitPolicy, TransactionalExecutor,
    Transport,
};

/// A service connection and the entities attached to it.
///
/// Changes are recorded locally and sent on [`Service::flush`] or
/// [`Service::flush_async`].
pub struct Service<T: Transport> {
    config: ServiceConfig,
    options: CompileOptions,
    transport: T,
    context: EntityContext,
    tracker: FlushTracker,
    cancel: CancelToken,
}

impl<T: Transport> Service<T> {
    pub fn new(config: ServiceConfig, transport: T) -> SessionResult<Self> {
        let root = config.validate()?;
        let options =
            CompileOptions::new(root).with_prefer_return_content(config.prefer_return_content);
        Ok(Self {
            config,
            options,
            transport,
            context: EntityContext::new(),
            tracker: FlushTracker::new(),
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn service_root(&self) -> &ServiceRoot {
        &self.options.service_root
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn context(&self) -> &EntityContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EntityContext {
        &mut self.context
    }

    pub fn flush_state(&self) -> FlushState {
        self.tracker.state()
    }

    /// Tracker shared with the running flush.
    pub fn flush_tracker(&self) -> FlushTracker {
        self.tracker.clone()
    }

    /// Token that cancels the current (or next) flush.
    ///
    /// A fresh token is installed once a cancelled flush has finished.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Track a new entity; it is created on the next flush.
    pub fn attach_new(&mut self, handle: &EntityHandle) -> SessionResult<()> {
        Ok(self.context.attach(handle, AttachedEntityStatus::New)?)
    }

    /// Track an entity read from the service.
    pub fn attach_loaded(&mut self, handle: &EntityHandle) -> SessionResult<()> {
        Ok(self.context.attach(handle, AttachedEntityStatus::Attached)?)
    }

    /// Record that a tracked entity was modified.
    ///
    /// Untracked handles are attached as `CHANGED`. `NEW` and `DELETED`
    /// handles keep their status.
    pub fn mark_changed(&mut self, handle: &EntityHandle) -> SessionResult<()> {
        match self.context.status(handle) {
            None => self.context.attach(handle, AttachedEntityStatus::Changed)?,
            Some(status) if status.is_clean_tracked() => self
                .context
                .set_status(handle, AttachedEntityStatus::Changed)?,
            Some(_) => {}
        }
        Ok(())
    }

    /// Schedule an entity for deletion.
    ///
    /// A tracked `NEW` entity was never sent, so it is discarded: nothing is
    /// sent for it and links that still point at it are dropped.
    pub fn delete(&mut self, handle: &EntityHandle) -> SessionResult<()> {
        match self.context.status(handle) {
            Some(AttachedEntityStatus::New) => {
                debug!("Delete of unsent {} discards it", handle);
                self.context.discard(handle);
            }
            Some(_) => self
                .context
                .set_status(handle, AttachedEntityStatus::Deleted)?,
            None => self.context.attach(handle, AttachedEntityStatus::Deleted)?,
        }
        Ok(())
    }

    /// Delete an entity known only by its URI.
    ///
    /// If an attached handle already lives at that address, the handle is
    /// deleted instead.
    pub fn delete_by_uri(&mut self, uri: &str) -> SessionResult<()> {
        let uri = self.options.service_root.resolve(uri);
        let root = &self.options.service_root;
        let tracked = self
            .context
            .iter()
            .find(|(handle, _)| handle.persisted_uri(root).as_deref() == Some(uri.as_str()))
            .map(|(handle, _)| handle.clone());
        match tracked {
            Some(handle) => self.delete(&handle),
            None => {
                self.context.add_deferred_delete(uri);
                Ok(())
            }
        }
    }

    pub fn get_by_identity(&self, identity: &EntityIdentity) -> Option<EntityHandle> {
        self.context.get_by_identity(identity)
    }

    /// Send every pending change, blocking the current thread.
    ///
    /// Runs [`Service::flush_async`] on a dedicated current-thread runtime.
    /// Inside an async context it fails with [`SessionError::Runtime`];
    /// await [`Service::flush_async`] there instead.
    pub fn flush(&mut self) -> SessionResult<FlushReport> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(SessionError::runtime(
                "flush() cannot block inside an async runtime, use flush_async()",
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| SessionError::runtime(err.to_string()))?;
        runtime.block_on(self.flush_async())
    }

    /// Send every pending change.
    ///
    /// Transactional mode either applies everything and clears the context,
    /// or fails and leaves it untouched. Non-transactional mode reports
    /// per-request failures in the returned [`FlushReport`] and keeps the
    /// affected entities attached.
    pub async fn flush_async(&mut self) -> SessionResult<FlushReport> {
        let lease = self.tracker.begin()?;
        let result = self.run_flush(&lease).await;
        if self.cancel.is_cancelled() {
            self.cancel = CancelToken::new();
        }
        result
    }

    async fn run_flush(&mut self, lease: &FlushLease) -> SessionResult<FlushReport> {
        let promoted = self.context.promote_dirty();
        info!(
            "Flush started: {} attached entities ({} newly changed), {} deferred deletes",
            self.context.len(),
            promoted,
            self.context.deferred_deletes().len()
        );

        let flush = compile(&mut self.context, &self.options)?;
        if flush.is_empty() {
            let mut report = FlushReport::new(0);
            report.detached = self.context.len();
            self.context.detach_all();
            info!("Nothing to flush, {} entities detached", report.detached);
            return Ok(report);
        }

        let mut policy = SubmitPolicy::new().with_cancel_token(self.cancel.clone());
        if let Some(timeout) = self.config.request_timeout() {
            policy = policy.with_timeout(timeout);
        }

        lease.advance(FlushState::Submitting);
        match self.config.execution {
            ExecutionMode::Transactional => {
                let executor = TransactionalExecutor::new(&self.transport, policy);
                let response = executor.submit(&flush).await?;
                lease.advance(FlushState::Reconciling);
                Ok(executor.reconcile(&flush, response, &mut self.context)?)
            }
            ExecutionMode::NonTransactional => {
                let executor = NonTransactionalExecutor::new(
                    &self.transport,
                    policy,
                    self.options.service_root.clone(),
                );
                let log = executor.submit(&flush).await;
                lease.advance(FlushState::Reconciling);
                Ok(executor.reconcile(&flush, &log, &mut self.context))
            }
        }
    }
}
