//! Wire requests.

use crate::EntityPayload;
use odsync_core::annotations::{self, ODATA_ID};
use odsync_core::{parse_content_reference, JsonMap, Position};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

/// HTTP method of a sub-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a request does to its owning entity; drives reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "stream", rename_all = "snake_case")]
pub enum RequestKind {
    /// Entity creation.
    Create,
    /// Partial update of properties and links.
    Update,
    /// Follow-up update carrying only navigation bindings.
    LinkUpdate,
    /// Entity deletion.
    Delete,
    /// Media resource body.
    MediaUpdate,
    /// Named stream property body.
    StreamUpdate(String),
    /// `$ref` collection membership addition.
    ReferenceAdd,
}

impl RequestKind {
    /// Returns true for requests whose response carries the entity.
    pub fn is_entity_write(&self) -> bool {
        matches!(self, RequestKind::Create | RequestKind::Update)
    }
}

/// Body of a sub-request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequestBody {
    Empty,
    Entity(EntityPayload),
    /// `{"@odata.id": uri}` body of a `$ref` request.
    Reference { uri: String },
    Binary { content_type: String, bytes: Vec<u8> },
}

impl RequestBody {
    /// JSON view of the body, if it is JSON.
    pub fn to_json(&self) -> Option<JsonMap> {
        match self {
            RequestBody::Entity(payload) => Some(payload.to_json()),
            RequestBody::Reference { uri } => {
                let mut body = JsonMap::new();
                body.insert(ODATA_ID.to_string(), JsonValue::String(uri.clone()));
                Some(body)
            }
            RequestBody::Empty | RequestBody::Binary { .. } => None,
        }
    }
}

/// One sub-request of a changeset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub kind: RequestKind,
}

impl WireRequest {
    pub fn new(method: HttpMethod, uri: impl Into<String>, kind: RequestKind) -> Self {
        Self {
            method,
            uri: uri.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            kind,
        }
    }

    /// `POST <entity set>` with an entity body.
    pub fn create(uri: impl Into<String>, payload: EntityPayload) -> Self {
        Self::new(HttpMethod::Post, uri, RequestKind::Create).body(RequestBody::Entity(payload))
    }

    /// `PATCH <entity>` with an entity body.
    pub fn update(uri: impl Into<String>, payload: EntityPayload) -> Self {
        Self::new(HttpMethod::Patch, uri, RequestKind::Update).body(RequestBody::Entity(payload))
    }

    /// `PATCH <entity>` carrying only bindings.
    pub fn link_update(uri: impl Into<String>, payload: EntityPayload) -> Self {
        Self::new(HttpMethod::Patch, uri, RequestKind::LinkUpdate)
            .body(RequestBody::Entity(payload))
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, uri, RequestKind::Delete)
    }

    /// `POST <source>/<property>/$ref`.
    pub fn reference_add(source: &str, property: &str, target: impl Into<String>) -> Self {
        Self::new(
            HttpMethod::Post,
            format!("{}/{}/$ref", source, property),
            RequestKind::ReferenceAdd,
        )
        .body(RequestBody::Reference { uri: target.into() })
    }

    /// `PUT` of a stream body.
    pub fn stream(
        uri: impl Into<String>,
        kind: RequestKind,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let content_type = content_type.into();
        Self::new(HttpMethod::Put, uri, kind)
            .header(annotations::CONTENT_TYPE, content_type.clone())
            .body(RequestBody::Binary {
                content_type,
                bytes,
            })
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Content-id positions this request refers to, in order of appearance.
    pub fn references(&self) -> Vec<Position> {
        let mut found = Vec::new();
        let mut note = |uri: &str| {
            if let Some((pos, _)) = parse_content_reference(uri) {
                if !found.contains(&pos) {
                    found.push(pos);
                }
            }
        };
        note(&self.uri);
        match &self.body {
            RequestBody::Entity(payload) => {
                for link in &payload.links {
                    for target in &link.targets {
                        note(target);
                    }
                }
            }
            RequestBody::Reference { uri } => note(uri),
            RequestBody::Empty | RequestBody::Binary { .. } => {}
        }
        found
    }

    /// Rewrite every `$<n>` reference with `lookup(n)`.
    ///
    /// Returns the first position `lookup` could not resolve as the error.
    pub fn resolve_references<F>(&self, lookup: F) -> Result<Self, Position>
    where
        F: Fn(Position) -> Option<String>,
    {
        let rewrite = |uri: &str| -> Result<String, Position> {
            match parse_content_reference(uri) {
                Some((pos, rest)) => lookup(pos)
                    .map(|base| format!("{}{}", base, rest))
                    .ok_or(pos),
                None => Ok(uri.to_string()),
            }
        };
        let uri = rewrite(&self.uri)?;
        let body = match &self.body {
            RequestBody::Entity(payload) => {
                let mut missing = None;
                let mapped = payload.map_targets(|target| match rewrite(target) {
                    Ok(resolved) => Some(resolved),
                    Err(pos) => {
                        missing = Some(pos);
                        None
                    }
                });
                match (mapped, missing) {
                    (Some(mapped), _) => RequestBody::Entity(mapped),
                    (None, Some(pos)) => return Err(pos),
                    (None, None) => RequestBody::Entity(payload.clone()),
                }
            }
            RequestBody::Reference { uri } => RequestBody::Reference { uri: rewrite(uri)? },
            other => other.clone(),
        };
        Ok(Self {
            method: self.method,
            uri,
            headers: self.headers.clone(),
            body,
            kind: self.kind.clone(),
        })
    }
}

impl fmt::Display for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.uri)
    }
}
