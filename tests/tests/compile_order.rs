//! Ordering and addressing of compiled changesets.

use odsync_compiler::{compile, CompileOptions, CompiledFlush};
use odsync_context::EntityContext;
use odsync_core::ServiceRoot;
use odsync_tests::prelude::*;

fn options() -> CompileOptions {
    CompileOptions::new(ServiceRoot::parse(SERVICE_ROOT).unwrap())
}

fn bodies(flush: &CompiledFlush) -> Vec<Option<serde_json::Map<String, serde_json::Value>>> {
    flush.changes.requests().map(|r| r.body.to_json()).collect()
}

mod round_trip {
    use super::*;
    #[allow(unused_imports)]
    use odsync_tests::prelude::assert_eq;

    #[test]
    fn test_link_target_is_created_first() {
        // GIVEN
        init_logger();
        let mut service = service(ExecutionMode::Transactional);
        let order = EntityHandle::new(order_type()).with_properties(props! { "Total" => 10 });
        let customer =
            EntityHandle::new(customer_type()).with_properties(props! { "Name" => "Ann" });
        order.set_link("Customer", &customer).unwrap();
        service.attach_new(&order).unwrap();

        // WHEN
        let report = service.flush().unwrap();

        // THEN
        let changeset = service.transport().last_changeset().unwrap();
        Expect::new()
            .post("Customers")
            .post("Orders")
            .check_changeset(&changeset);
        assert_eq!(
            changeset.parts[1].request.body.to_json().unwrap(),
            props! { "Total" => 10, "Customer@odata.bind" => "$1" }
        );
        assert_eq!(report.submitted, 2);
        assert!(service.context().is_empty());
        assert_eq!(customer.key(), Some(EntityKey::from(1i64)));
        assert_eq!(order.key(), Some(EntityKey::from(2i64)));
        assert_eq!(order.payload(), props! { "Total" => 10, "ID" => 2 });
        assert!(order.property_changes().is_empty());
        assert!(order.link_change("Customer").is_none());
    }

    #[test]
    fn test_target_without_entity_set_uses_navigation_target_set() {
        let mut service = service(ExecutionMode::Transactional);
        let order = EntityHandle::new(order_type());
        let note = EntityHandle::new(note_type()).with_properties(props! { "Text" => "fragile" });
        order.add_link("Notes", &note).unwrap();
        service.attach_new(&order).unwrap();

        service.flush().unwrap();

        let changeset = service.transport().last_changeset().unwrap();
        Expect::new().post("Notes").post("Orders").check_changeset(&changeset);
        assert_eq!(
            changeset.parts[1].request.body.to_json().unwrap(),
            props! { "Notes@odata.bind" => json!(["$1"]) }
        );
    }
}

mod circular {
    use super::*;
    #[allow(unused_imports)]
    use odsync_tests::prelude::assert_eq;

    #[test]
    fn test_mutual_references_resolve_through_a_follow_up() {
        // GIVEN
        let mut context = EntityContext::new();
        let a = EntityHandle::new(customer_type()).with_properties(props! { "Name" => "A" });
        let b = EntityHandle::new(customer_type()).with_properties(props! { "Name" => "B" });
        a.set_link("Referrer", &b).unwrap();
        b.set_link("Referrer", &a).unwrap();
        context.attach(&a, AttachedEntityStatus::New).unwrap();
        context.attach(&b, AttachedEntityStatus::New).unwrap();

        // WHEN
        let flush = compile(&mut context, &options()).unwrap();

        // THEN
        let requests: Vec<WireRequest> = flush.changes.requests().cloned().collect();
        Expect::new()
            .post("Customers")
            .post("Customers")
            .patch("$1")
            .check_requests(&requests);
        assert_eq!(requests[2].kind, RequestKind::LinkUpdate);
        assert_eq!(
            bodies(&flush)[2],
            Some(props! { "Referrer@odata.bind" => "$2" })
        );
        for (index, request) in requests.iter().enumerate() {
            for reference in request.references() {
                assert!(
                    (reference.raw() as usize) <= index,
                    "{} refers forward to {}",
                    request,
                    reference
                );
            }
        }
    }

    #[test]
    fn test_three_entity_cycle() {
        // GIVEN: A -> B -> C -> A
        let mut context = EntityContext::new();
        let handles: Vec<EntityHandle> = ["A", "B", "C"]
            .iter()
            .map(|n| EntityHandle::new(customer_type()).with_properties(props! { "Name" => *n }))
            .collect();
        for (i, handle) in handles.iter().enumerate() {
            handle.set_link("Referrer", &handles[(i + 1) % 3]).unwrap();
        }
        context.attach(&handles[0], AttachedEntityStatus::New).unwrap();

        // WHEN
        let flush = compile(&mut context, &options()).unwrap();

        // THEN: C first, then B bound to C, A bound to B, C patched to A.
        let requests: Vec<WireRequest> = flush.changes.requests().cloned().collect();
        Expect::new()
            .post("Customers")
            .post("Customers")
            .post("Customers")
            .patch("$1")
            .check_requests(&requests);
        assert_eq!(
            bodies(&flush)[1],
            Some(props! { "Name" => "B", "Referrer@odata.bind" => "$1" })
        );
        assert_eq!(
            bodies(&flush)[3],
            Some(props! { "Referrer@odata.bind" => "$3" })
        );
        assert_eq!(context.len(), 3);
    }
}

mod discovery_order {
    use super::*;
    #[allow(unused_imports)]
    use odsync_tests::prelude::assert_eq;

    #[test]
    fn test_independent_entities_keep_attachment_order() {
        // GIVEN
        let mut service = service(ExecutionMode::Transactional);
        let handles: Vec<EntityHandle> = ["X", "Y", "Z"]
            .iter()
            .map(|n| EntityHandle::new(customer_type()).with_properties(props! { "Name" => *n }))
            .collect();
        for handle in &handles {
            service.attach_new(handle).unwrap();
        }

        // WHEN
        service.flush().unwrap();

        // THEN
        let changeset = service.transport().last_changeset().unwrap();
        let names: Vec<_> = changeset
            .parts
            .iter()
            .map(|p| p.request.body.to_json().unwrap()["Name"].clone())
            .collect();
        assert_eq!(names, vec![json!("X"), json!("Y"), json!("Z")]);
        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(handle.key(), Some(EntityKey::from(i as i64 + 1)));
        }
    }

    #[test]
    fn test_unchanged_attached_entity_consumes_no_position() {
        // GIVEN
        let mut context = EntityContext::new();
        let clean = EntityHandle::loaded(customer_type(), props! { "ID" => 5, "Name" => "Old" });
        let fresh = EntityHandle::new(customer_type()).with_properties(props! { "Name" => "New" });
        context.attach(&clean, AttachedEntityStatus::Attached).unwrap();
        context.attach(&fresh, AttachedEntityStatus::New).unwrap();

        // WHEN
        let flush = compile(&mut context, &options()).unwrap();

        // THEN
        assert_eq!(flush.changes.len(), 1);
        assert_eq!(flush.items.handle_at(Position::new(1)), Some(&fresh));
        assert!(!flush.items.contains(&clean));
    }

    #[test]
    fn test_compilation_is_deterministic() {
        fn build() -> CompiledFlush {
            let mut context = EntityContext::new();
            let customer =
                EntityHandle::new(customer_type()).with_properties(props! { "Name" => "A" });
            let first = EntityHandle::new(order_type()).with_properties(props! { "Total" => 1 });
            let second = EntityHandle::new(order_type()).with_properties(props! { "Total" => 2 });
            customer.add_link("Orders", &first).unwrap();
            customer.add_link("Orders", &second).unwrap();
            first.set_link("Customer", &customer).unwrap();
            context.attach(&customer, AttachedEntityStatus::New).unwrap();
            context.attach(&second, AttachedEntityStatus::New).unwrap();
            compile(&mut context, &options()).unwrap()
        }

        let left = build();
        let right = build();

        let wire = |flush: &CompiledFlush| -> Vec<(HttpMethod, String, Option<serde_json::Value>)> {
            flush
                .changes
                .requests()
                .map(|r| {
                    (
                        r.method,
                        r.uri.clone(),
                        r.body.to_json().map(serde_json::Value::Object),
                    )
                })
                .collect()
        };
        assert_eq!(wire(&left), wire(&right));
        assert_eq!(left.items.sorted_values(), right.items.sorted_values());
    }
}

mod deletes {
    use super::*;
    #[allow(unused_imports)]
    use odsync_tests::prelude::assert_eq;

    #[test]
    fn test_delete_by_uri_comes_last_without_item() {
        // GIVEN
        let mut service = service(ExecutionMode::Transactional);
        let a = EntityHandle::new(customer_type()).with_properties(props! { "Name" => "A" });
        let b = EntityHandle::new(customer_type()).with_properties(props! { "Name" => "B" });
        a.set_link("Referrer", &b).unwrap();
        b.set_link("Referrer", &a).unwrap();
        service.delete_by_uri("Customers(9)").unwrap();
        service.attach_new(&a).unwrap();
        service.attach_new(&b).unwrap();

        // WHEN
        let flush = compile(service.context_mut(), &options()).unwrap();

        // THEN
        let requests: Vec<WireRequest> = flush.changes.requests().cloned().collect();
        Expect::new()
            .post("Customers")
            .post("Customers")
            .patch("$1")
            .delete("Customers(9)")
            .check_requests(&requests);
        assert_eq!(flush.items.handle_at(Position::new(4)), None);
        assert_eq!(flush.changes.get(Position::new(4)).unwrap().1, None);
    }

    #[test]
    fn test_deleted_new_entity_is_not_created_through_a_link() {
        // GIVEN
        let mut service = service(ExecutionMode::Transactional);
        let customer =
            EntityHandle::new(customer_type()).with_properties(props! { "Name" => "Ann" });
        let order = EntityHandle::new(order_type()).with_properties(props! { "Total" => 4 });
        order.set_link("Customer", &customer).unwrap();
        service.attach_new(&customer).unwrap();
        service.attach_new(&order).unwrap();

        // WHEN
        service.delete(&customer).unwrap();
        let report = service.flush().unwrap();

        // THEN
        let changeset = service.transport().last_changeset().unwrap();
        Expect::new().post("Orders").check_changeset(&changeset);
        assert_eq!(
            changeset.parts[0].request.body.to_json().unwrap(),
            props! { "Total" => 4 }
        );
        assert_eq!(report.submitted, 1);
        assert_eq!(customer.key(), None);
        assert!(service.context().is_empty());
    }

    #[test]
    fn test_delete_of_persisted_entity_carries_etag() {
        let mut service = service(ExecutionMode::Transactional);
        let customer =
            EntityHandle::loaded(customer_type(), props! { "ID" => 3, "@odata.etag" => "W/\"7\"" });
        service.attach_loaded(&customer).unwrap();

        service.delete(&customer).unwrap();
        service.flush().unwrap();

        let changeset = service.transport().last_changeset().unwrap();
        Expect::new().delete("Customers(3)").check_changeset(&changeset);
        assert_eq!(
            changeset.parts[0].request.header_value("If-Match"),
            Some("W/\"7\"")
        );
        assert!(service.context().is_empty());
    }

    #[test]
    fn test_delete_without_key_fails_before_submission() {
        let mut service = service(ExecutionMode::Transactional);
        let orphan = EntityHandle::new(customer_type());

        service.delete(&orphan).unwrap();
        let result = service.flush();

        assert!(matches!(result, Err(SessionError::Compile(_))));
        assert!(service.transport().changesets().is_empty());
    }
}

mod streams {
    use super::*;
    #[allow(unused_imports)]
    use odsync_tests::prelude::assert_eq;

    #[test]
    fn test_new_media_entity_streams_follow_the_create() {
        // GIVEN
        let mut service = service(ExecutionMode::Transactional);
        let photo = EntityHandle::new(photo_type()).with_properties(props! { "Title" => "Sea" });
        photo.set_media_stream("image/jpeg", vec![1, 2, 3]).unwrap();
        photo.set_stream_property("Thumbnail", "image/png", vec![4]).unwrap();
        service.attach_new(&photo).unwrap();

        // WHEN
        service.flush().unwrap();

        // THEN
        let changeset = service.transport().last_changeset().unwrap();
        Expect::new()
            .post("Photos")
            .put("$1/$value")
            .put("$1/Thumbnail")
            .check_changeset(&changeset);
        assert_eq!(
            changeset.parts[1].request.header_value("Content-Type"),
            Some("image/jpeg")
        );
        assert!(photo.media_change().is_none());
        assert!(photo.stream_change("Thumbnail").is_none());
    }

    #[test]
    fn test_persisted_media_uses_media_edit_link() {
        let mut service = service(ExecutionMode::Transactional);
        let photo = EntityHandle::loaded(
            photo_type(),
            props! { "ID" => 4, "@odata.mediaEditLink" => "Photos(4)/$value", "@odata.etag" => "W/\"1\"" },
        );
        service.attach_loaded(&photo).unwrap();
        photo.set_media_stream("image/jpeg", vec![9]).unwrap();

        service.flush().unwrap();

        // The entity itself is marked changed, so its PATCH comes first.
        let changeset = service.transport().last_changeset().unwrap();
        Expect::new()
            .patch("Photos(4)")
            .put("Photos(4)/$value")
            .check_changeset(&changeset);
        assert_eq!(
            changeset.parts[1].request.header_value("If-Match"),
            Some("W/\"1\"")
        );
    }
}
