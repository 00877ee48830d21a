//! Entity type descriptors.
//!
//! A minimal view of the service schema: just enough for the handle to
//! validate link changes and for the compiler to address entities.

use std::sync::Arc;

/// Navigation property declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationProperty {
    /// Property name.
    pub name: String,
    /// Qualified name of the declared target type.
    pub target_type: String,
    /// Whether the navigation is collection-valued.
    pub collection: bool,
    /// Entity set targets are assigned to when they have none.
    pub target_entity_set: Option<String>,
}

impl NavigationProperty {
    /// Declare a single-valued navigation.
    pub fn single(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            collection: false,
            target_entity_set: None,
        }
    }

    /// Declare a collection-valued navigation.
    pub fn collection(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            collection: true,
            target_entity_set: None,
        }
    }

    pub fn with_target_set(mut self, entity_set: impl Into<String>) -> Self {
        self.target_entity_set = Some(entity_set.into());
        self
    }
}

/// Entity type definition.
#[derive(Debug, Clone)]
pub struct EntityTypeDef {
    /// Qualified type name (e.g. `Demo.Customer`).
    pub name: String,
    /// Default entity set for instances of this type.
    pub entity_set: Option<String>,
    /// Key property names, in declaration order.
    pub key: Vec<String>,
    /// Navigation properties, in declaration order.
    pub navigation: Vec<NavigationProperty>,
    /// Whether instances carry a media stream (`$value`).
    pub has_stream: bool,
    /// Named stream properties.
    pub stream_properties: Vec<String>,
    /// Base type, if derived.
    pub base: Option<Arc<EntityTypeDef>>,
}

impl EntityTypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_set: None,
            key: Vec::new(),
            navigation: Vec::new(),
            has_stream: false,
            stream_properties: Vec::new(),
            base: None,
        }
    }

    pub fn entity_set(mut self, entity_set: impl Into<String>) -> Self {
        self.entity_set = Some(entity_set.into());
        self
    }

    pub fn key(mut self, property: impl Into<String>) -> Self {
        self.key.push(property.into());
        self
    }

    pub fn navigation(mut self, property: NavigationProperty) -> Self {
        self.navigation.push(property);
        self
    }

    /// Mark as a media entity.
    pub fn media(mut self) -> Self {
        self.has_stream = true;
        self
    }

    pub fn stream(mut self, property: impl Into<String>) -> Self {
        self.stream_properties.push(property.into());
        self
    }

    /// Derive from a base type; key, navigation and streams are inherited.
    pub fn derives(mut self, base: Arc<EntityTypeDef>) -> Self {
        if self.key.is_empty() {
            self.key = base.key.clone();
        }
        if self.entity_set.is_none() {
            self.entity_set = base.entity_set.clone();
        }
        self.has_stream |= base.has_stream;
        let mut navigation = base.navigation.clone();
        navigation.append(&mut self.navigation);
        self.navigation = navigation;
        let mut streams = base.stream_properties.clone();
        streams.append(&mut self.stream_properties);
        self.stream_properties = streams;
        self.base = Some(base);
        self
    }

    /// Finish the definition.
    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Look up a navigation property with its declaration index.
    pub fn navigation_property(&self, name: &str) -> Option<(usize, &NavigationProperty)> {
        self.navigation
            .iter()
            .enumerate()
            .find(|(_, nav)| nav.name == name)
    }

    /// Check whether a named stream property is declared.
    pub fn has_stream_property(&self, name: &str) -> bool {
        self.stream_properties.iter().any(|s| s == name)
    }

    /// Returns true if this type is `type_name` or derives from it.
    pub fn is_assignable_to(&self, type_name: &str) -> bool {
        if self.name == type_name {
            return true;
        }
        let mut current = self.base.as_deref();
        while let Some(def) = current {
            if def.name == type_name {
                return true;
            }
            current = def.base.as_deref();
        }
        false
    }
}
