//! odsync Session
//!
//! The unit of work applications talk to.
//!
//! Responsibilities:
//! - Load and validate the service configuration
//! - Attach, mark and delete entities in the context
//! - Run a flush: compile, submit, reconcile
//! - Allow one flush at a time and expose its progress

mod config;
mod error;
mod service;
mod state;

pub use config::{ExecutionMode, ServiceConfig};
pub use error::{SessionError, SessionResult};
pub use service::Service;
pub use state::{FlushLease, FlushState, FlushTracker};
