//! Applying one successful response to its owning handle.

use crate::WireResponse;
use odsync_changeset::RequestKind;
use odsync_core::EntityHandle;

/// Reconcile `response` onto `handle` according to the request kind.
///
/// Entity writes replace the payload (when a body came back) and clear the
/// property, annotation, link and reference buffers; stream writes clear
/// their own stream buffer; deletes and `$ref` additions need nothing.
pub fn apply_response(handle: &EntityHandle, kind: &RequestKind, response: &WireResponse) {
    match kind {
        RequestKind::Create => {
            handle.apply_server_entity(response.body.as_ref(), response.location(), response.etag())
        }
        RequestKind::Update | RequestKind::LinkUpdate => {
            handle.apply_server_entity(response.body.as_ref(), None, response.etag())
        }
        RequestKind::MediaUpdate => handle.clear_media_change(),
        RequestKind::StreamUpdate(name) => handle.clear_stream_change(name),
        RequestKind::Delete | RequestKind::ReferenceAdd => {}
    }
}
