//! odsync Tests
//!
//! Harness for scenario-level tests of the flush pipeline.
//!
//! Responsibilities:
//! - Record what reaches the transport and replay scripted responses
//! - Provide the entity types the scenarios share
//! - Compare submitted requests against an expected sequence

mod assertion;
mod fixtures;

pub use assertion::Expect;
pub use fixtures::*;
pub use transport::MockTransport;

/// Install the test logger once.
pub fn init_logger() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();
}

pub mod prelude {
    pub use crate::{
        customer_type, init_logger, note_type, order_type, photo_type, service, Expect,
        MockTransport, SERVICE_ROOT,
    };
    pub use odsync_changeset::{HttpMethod, RequestKind, WireRequest};
    pub use odsync_context::AttachedEntityStatus;
    pub use odsync_core::{props, EntityHandle, EntityIdentity, EntityKey, Position};
    pub use odsync_executor::{
        BatchResponse, ExecutorError, FlushReport, TransportError, WireResponse,
    };
    pub use odsync_session::{ExecutionMode, Service, ServiceConfig, SessionError};
    pub use pretty_assertions::assert_eq;
    pub use serde_json::json;
}
