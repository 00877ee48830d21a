//! odsync Executor
//!
//! Submit a compiled flush and reconcile the responses onto local state.
//!
//! Responsibilities:
//! - Define the transport boundary (`Transport`)
//! - Bound every submission by a timeout and a cancellation token
//! - Atomic execution of one changeset (`TransactionalExecutor`)
//! - Best-effort execution request by request (`NonTransactionalExecutor`)
//! - Summarize the outcome in a `FlushReport`

mod error;
mod non_transactional;
mod policy;
mod reconcile;
mod report;
mod transactional;
mod transport;

pub use error::{ExecutorError, ExecutorResult};
pub use non_transactional::{NonTransactionalExecutor, RequestOutcome, SubmissionLog};
pub use policy::{CancelToken, SubmitPolicy};
pub use reconcile::apply_response;
pub use report::{FlushReport, RequestFailure};
pub use transactional::TransactionalExecutor;
pub use transport::{BatchResponse, Transport, TransportError, WireResponse};
