//! Transport boundary.
//!
//! The HTTP client, payload encoding and authentication live behind
//! [`Transport`]. Executors only see decoded responses.

use async_trait::async_trait;
use odsync_changeset::{Changeset, WireRequest};
use odsync_core::annotations::{ETAG, LOCATION, ODATA_ENTITY_ID};
use odsync_core::JsonMap;
use thiserror::Error;

/// Failure reported by the transport itself (connection, encoding, ...).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("transport error: {message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response to one sub-request.
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Decoded JSON body, if any.
    pub body: Option<JsonMap>,
}

impl WireResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: JsonMap) -> Self {
        self.body = Some(body);
        self
    }

    /// Header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Address of a created entity from `Location` or `OData-EntityId`.
    pub fn location(&self) -> Option<&str> {
        self.header_value(LOCATION)
            .or_else(|| self.header_value(ODATA_ENTITY_ID))
    }

    pub fn etag(&self) -> Option<&str> {
        self.header_value(ETAG)
    }

    pub fn is_failure(&self) -> bool {
        self.status >= 400
    }

    /// Error message from an OData error body, else a generic one.
    pub fn error_message(&self) -> String {
        self.body
            .as_ref()
            .and_then(|body| body.get("error"))
            .and_then(|error| error.get("message"))
            .and_then(|message| message.as_str())
            .map(String::from)
            .unwrap_or_else(|| format!("request failed with status {}", self.status))
    }
}

/// Response to a whole changeset.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    /// Status of the outer envelope.
    pub status: u16,
    pub message: Option<String>,
    /// Sub-responses in content-id order.
    pub responses: Vec<WireResponse>,
}

impl BatchResponse {
    pub fn new(status: u16, responses: Vec<WireResponse>) -> Self {
        Self {
            status,
            message: None,
            responses,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Outer envelope success: 200 or 202.
    pub fn is_envelope_success(&self) -> bool {
        matches!(self.status, 200 | 202)
    }
}

/// Sends requests to the service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit a changeset as one atomic batch.
    async fn submit_changeset(&self, changeset: &Changeset) -> Result<BatchResponse, TransportError>;

    /// Submit a single request.
    async fn execute(&self, request: &WireRequest) -> Result<WireResponse, TransportError>;
}
