//! Outgoing entity bodies.

use odsync_core::annotations::bind_annotation;
use odsync_core::JsonMap;
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A navigation binding inside an entity body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationLink {
    pub name: String,
    pub collection: bool,
    /// Target URIs: real addresses or `$<n>` references.
    pub targets: Vec<String>,
}

/// Body of a create or update request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityPayload {
    pub properties: JsonMap,
    pub annotations: JsonMap,
    pub links: Vec<NavigationLink>,
}

impl EntityPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body carrying the given properties and annotations.
    pub fn with_properties(properties: JsonMap, annotations: JsonMap) -> Self {
        Self {
            properties,
            annotations,
            links: Vec::new(),
        }
    }

    /// Bind `target` to the navigation `name`.
    ///
    /// Bindings to the same navigation are grouped in one entry.
    pub fn bind(&mut self, name: &str, collection: bool, target: impl Into<String>) {
        let target = target.into();
        match self.links.iter_mut().find(|link| link.name == name) {
            Some(link) => {
                if !link.targets.contains(&target) {
                    link.targets.push(target);
                }
            }
            None => self.links.push(NavigationLink {
                name: name.to_string(),
                collection,
                targets: vec![target],
            }),
        }
    }

    /// Returns true if only bindings are carried.
    pub fn is_links_only(&self) -> bool {
        self.properties.is_empty() && self.annotations.is_empty()
    }

    /// Rewrite every binding target; a `None` from `resolve` aborts.
    pub fn map_targets<F>(&self, mut resolve: F) -> Option<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut links = Vec::with_capacity(self.links.len());
        for link in &self.links {
            let mut targets = Vec::with_capacity(link.targets.len());
            for target in &link.targets {
                targets.push(resolve(target)?);
            }
            links.push(NavigationLink {
                name: link.name.clone(),
                collection: link.collection,
                targets,
            });
        }
        Some(Self {
            properties: self.properties.clone(),
            annotations: self.annotations.clone(),
            links,
        })
    }

    /// Render as an OData JSON object with `@odata.bind` annotations.
    pub fn to_json(&self) -> JsonMap {
        let mut body = self.properties.clone();
        for (term, value) in &self.annotations {
            body.insert(term.clone(), value.clone());
        }
        for link in &self.links {
            let value = if link.collection {
                JsonValue::Array(link.targets.iter().cloned().map(JsonValue::String).collect())
            } else {
                link.targets
                    .last()
                    .cloned()
                    .map(JsonValue::String)
                    .unwrap_or(JsonValue::Null)
            };
            body.insert(bind_annotation(&link.name), value);
        }
        body
    }
}
