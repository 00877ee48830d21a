//! Atomic execution of one changeset.

use crate::{
    apply_response, BatchResponse, ExecutorError, ExecutorResult, FlushReport, SubmitPolicy,
    Transport,
};
use log::{debug, info};
use odsync_compiler::CompiledFlush;
use odsync_context::EntityContext;

/// Submits the whole flush as one changeset; all or nothing.
pub struct TransactionalExecutor<'t, T: Transport + ?Sized> {
    transport: &'t T,
    policy: SubmitPolicy,
}

impl<'t, T: Transport + ?Sized> TransactionalExecutor<'t, T> {
    pub fn new(transport: &'t T, policy: SubmitPolicy) -> Self {
        Self { transport, policy }
    }

    /// Send the changeset.
    pub async fn submit(&self, flush: &CompiledFlush) -> ExecutorResult<BatchResponse> {
        let changeset = flush.changes.to_changeset();
        info!("Submitting changeset with {} requests", changeset.len());
        self.policy
            .run(self.transport.submit_changeset(&changeset))
            .await
    }

    /// Check the batch response and apply it.
    ///
    /// Any failure leaves every handle and the context untouched.
    pub fn reconcile(
        &self,
        flush: &CompiledFlush,
        response: BatchResponse,
        context: &mut EntityContext,
    ) -> ExecutorResult<FlushReport> {
        if !response.is_envelope_success() {
            let message = response
                .message
                .clone()
                .unwrap_or_else(|| format!("changeset rejected with status {}", response.status));
            return Err(ExecutorError::transaction_failure(response.status, message, None));
        }

        let expected = flush.changes.len();
        if response.responses.len() < expected {
            return Err(ExecutorError::inconsistent_response(
                expected,
                response.responses.len(),
            ));
        }

        if let Some((index, failed)) = response
            .responses
            .iter()
            .take(expected)
            .enumerate()
            .find(|(_, r)| r.is_failure())
        {
            return Err(ExecutorError::transaction_failure(
                failed.status,
                failed.error_message(),
                Some(index as u32 + 1),
            ));
        }

        // Responses line up with positions; owners are found through the items.
        for position in flush.items.sorted_values() {
            let (Some(handle), Some((request, _))) =
                (flush.items.handle_at(position), flush.changes.get(position))
            else {
                continue;
            };
            let sub_response = &response.responses[position.index()];
            debug!("{}: Reconcile '{}' with {}", position, handle, sub_response.status);
            apply_response(handle, &request.kind, sub_response);
        }

        let mut report = FlushReport::new(expected);
        report.succeeded = expected;
        report.detached = context.len();
        context.detach_all();
        info!(
            "Changeset applied: {} requests, {} entities detached",
            report.submitted, report.detached
        );
        Ok(report)
    }

    /// Submit and reconcile.
    pub async fn execute(
        &self,
        flush: &CompiledFlush,
        context: &mut EntityContext,
    ) -> ExecutorResult<FlushReport> {
        let response = self.submit(flush).await?;
        self.reconcile(flush, response, context)
    }
}
