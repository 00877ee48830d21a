//! OData JSON control annotations and header names used on the wire.

/// Suffix of a navigation binding annotation (`Orders@odata.bind`).
pub const BIND_SUFFIX: &str = "@odata.bind";

/// Entity id annotation; also the body of a `$ref` request.
pub const ODATA_ID: &str = "@odata.id";

/// Edit link annotation.
pub const ODATA_EDIT_LINK: &str = "@odata.editLink";

/// Media edit link annotation.
pub const ODATA_MEDIA_EDIT_LINK: &str = "@odata.mediaEditLink";

/// ETag annotation.
pub const ODATA_ETAG: &str = "@odata.etag";

/// Optimistic-concurrency precondition header.
pub const IF_MATCH: &str = "If-Match";

/// Response preference header.
pub const PREFER: &str = "Prefer";

/// Preference asking the service to return the changed entity.
pub const RETURN_REPRESENTATION: &str = "return=representation";

/// Content type header.
pub const CONTENT_TYPE: &str = "Content-Type";

/// Location header of a create response.
pub const LOCATION: &str = "Location";

/// Entity id header of a create response without content.
pub const ODATA_ENTITY_ID: &str = "OData-EntityId";

/// ETag header.
pub const ETAG: &str = "ETag";

/// Build the binding annotation name for a navigation property.
pub fn bind_annotation(property: &str) -> String {
    format!("{}{}", property, BIND_SUFFIX)
}
