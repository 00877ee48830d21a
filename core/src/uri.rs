//! Service root and entity addressing.
//!
//! Real entities are addressed relative to the service root
//! (`<root>Customers('ALFKI')`); entities created earlier in the same
//! changeset are addressed by content-id reference (`$3`, `$3/$value`).

use crate::{CoreError, CoreResult, EntityKey, KeyValue, Position};
use regex_lite::Regex;
use std::fmt;
use std::sync::OnceLock;

fn content_reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\$([0-9]+)(/.*)?$").expect("static pattern"))
}

fn entity_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_.]*)\(([^()]*)\)$").expect("static pattern")
    })
}

/// Absolute service root, always ending with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRoot(String);

impl ServiceRoot {
    /// Parse and normalize a service root URL.
    pub fn parse(root: &str) -> CoreResult<Self> {
        let trimmed = root.trim();
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(CoreError::invalid_service_root(root));
        }
        let mut normalized = trimmed.to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve a link against the root.
    ///
    /// Absolute links and content-id references are returned unchanged.
    pub fn resolve(&self, link: &str) -> String {
        if is_absolute(link) || is_content_reference(link) {
            link.to_string()
        } else {
            format!("{}{}", self.0, link.trim_start_matches('/'))
        }
    }

    /// Address of an entity set.
    pub fn entity_set_uri(&self, entity_set: &str) -> String {
        self.resolve(entity_set)
    }

    /// Address of an entity by set and key.
    pub fn entity_uri(&self, entity_set: &str, key: &EntityKey) -> String {
        format!("{}{}{}", self.0, entity_set, key.to_predicate())
    }

    /// Strip the root prefix from a link, if present.
    pub fn relative<'a>(&self, link: &'a str) -> &'a str {
        link.strip_prefix(self.0.as_str()).unwrap_or(link)
    }
}

impl fmt::Display for ServiceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_absolute(link: &str) -> bool {
    link.starts_with("http://") || link.starts_with("https://")
}

/// Returns true if the URI is a content-id reference (`$<n>...`).
pub fn is_content_reference(uri: &str) -> bool {
    content_reference_pattern().is_match(uri)
}

/// Split a content-id reference into its position and trailing path.
///
/// `$3/$value` yields `(3, "/$value")`; `$3` yields `(3, "")`.
pub fn parse_content_reference(uri: &str) -> Option<(Position, &str)> {
    let captures = content_reference_pattern().captures(uri)?;
    let pos = captures.get(1)?.as_str().parse::<u32>().ok()?;
    let rest = captures.get(2).map(|m| m.as_str()).unwrap_or("");
    Some((Position::new(pos), rest))
}

/// Parse a relative entity path (`Customers('ALFKI')`) into set and key.
pub fn parse_entity_path(path: &str) -> Option<(String, EntityKey)> {
    let captures = entity_path_pattern().captures(path)?;
    let set = captures.get(1)?.as_str().to_string();
    let predicate = captures.get(2)?.as_str();
    let key = parse_key_predicate(predicate)?;
    Some((set, key))
}

fn parse_key_predicate(predicate: &str) -> Option<EntityKey> {
    if predicate.is_empty() {
        return None;
    }
    let parts: Vec<&str> = predicate.split(',').collect();
    if parts.len() == 1 && !parts[0].contains('=') {
        return parse_key_literal(parts[0]).map(EntityKey::Single);
    }
    let mut named = Vec::with_capacity(parts.len());
    for part in parts {
        let (name, literal) = part.split_once('=')?;
        named.push((name.trim().to_string(), parse_key_literal(literal)?));
    }
    Some(EntityKey::Composite(named))
}

fn parse_key_literal(literal: &str) -> Option<KeyValue> {
    let literal = literal.trim();
    if let Some(inner) = literal
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Some(KeyValue::String(inner.replace("''", "'")));
    }
    match literal {
        "true" => return Some(KeyValue::Bool(true)),
        "false" => return Some(KeyValue::Bool(false)),
        _ => {}
    }
    if let Ok(i) = literal.parse::<i64>() {
        return Some(KeyValue::Int(i));
    }
    if literal.len() == 36 && literal.chars().all(|c| c.is_ascii_hexdigit() || c == '-') {
        return Some(KeyValue::Guid(literal.to_string()));
    }
    None
}
