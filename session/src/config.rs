//! Service configuration.

use crate::{SessionError, SessionResult};
use odsync_core::ServiceRoot;
use serde::Deserialize;
use std::time::Duration;

/// How a flush is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One atomic changeset.
    #[default]
    Transactional,
    /// Independent requests, best effort.
    NonTransactional,
}

/// Settings of one service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Absolute service root URL.
    pub service_root: String,
    pub execution: ExecutionMode,
    /// Upper bound for each transport call; `None` waits forever.
    pub request_timeout_ms: Option<u64>,
    /// Ask the service to return updated entities.
    pub prefer_return_content: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            service_root: String::new(),
            execution: ExecutionMode::Transactional,
            request_timeout_ms: Some(30_000),
            prefer_return_content: false,
        }
    }
}

impl ServiceConfig {
    pub fn new(service_root: impl Into<String>) -> Self {
        Self {
            service_root: service_root.into(),
            ..Self::default()
        }
    }

    /// Load from a JSON document.
    pub fn from_json(json: &str) -> SessionResult<Self> {
        serde_json::from_str(json).map_err(|err| SessionError::invalid_config(err.to_string()))
    }

    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout_ms = timeout.map(|t| t.as_millis() as u64);
        self
    }

    pub fn with_prefer_return_content(mut self, prefer: bool) -> Self {
        self.prefer_return_content = prefer;
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Check the settings and parse the service root.
    pub fn validate(&self) -> SessionResult<ServiceRoot> {
        if self.service_root.trim().is_empty() {
            return Err(SessionError::invalid_config("service_root is required"));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(SessionError::invalid_config(
                "request_timeout_ms must be greater than zero",
            ));
        }
        Ok(ServiceRoot::parse(&self.service_root)?)
    }
}
