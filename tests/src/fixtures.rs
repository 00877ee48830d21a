//! Entity types shared by the scenarios.

use crate::MockTransport;
use odsync_core::{EntityTypeDef, NavigationProperty};
use odsync_session::{ExecutionMode, Service, ServiceConfig};
use std::sync::Arc;

pub const SERVICE_ROOT: &str = "http://host/svc/";

/// `Customers`: `Orders` collection and a self-referencing `Referrer`.
pub fn customer_type() -> Arc<EntityTypeDef> {
    EntityTypeDef::new("Demo.Customer")
        .entity_set("Customers")
        .key("ID")
        .navigation(NavigationProperty::collection("Orders", "Demo.Order"))
        .navigation(NavigationProperty::single("Referrer", "Demo.Customer"))
        .build()
}

/// `Orders`: single `Customer`, `Notes` collection into the `Notes` set.
pub fn order_type() -> Arc<EntityTypeDef> {
    EntityTypeDef::new("Demo.Order")
        .entity_set("Orders")
        .key("ID")
        .navigation(NavigationProperty::single("Customer", "Demo.Customer"))
        .navigation(
            NavigationProperty::collection("Notes", "Demo.Note").with_target_set("Notes"),
        )
        .build()
}

/// No default entity set; reached only through `Order.Notes`.
pub fn note_type() -> Arc<EntityTypeDef> {
    EntityTypeDef::new("Demo.Note").key("ID").build()
}

/// Media entity with a named `Thumbnail` stream.
pub fn photo_type() -> Arc<EntityTypeDef> {
    EntityTypeDef::new("Demo.Photo")
        .entity_set("Photos")
        .key("ID")
        .media()
        .stream("Thumbnail")
        .build()
}

/// A service over a fresh mock transport.
pub fn service(mode: ExecutionMode) -> Service<MockTransport> {
    let config = ServiceConfig::new(SERVICE_ROOT).with_execution(mode);
    match Service::new(config, MockTransport::new()) {
        Ok(service) => service,
        Err(err) => panic!("fixture service config rejected: {}", err),
    }
}
