//! Best-effort flushes, one request at a time.

use odsync_tests::prelude::*;

fn new_customer(name: &str) -> EntityHandle {
    EntityHandle::new(customer_type()).with_properties(props! { "Name" => name })
}

mod addressing {
    use super::*;
    #[allow(unused_imports)]
    use odsync_tests::prelude::assert_eq;

    #[tokio::test]
    async fn test_content_references_become_server_addresses() {
        // GIVEN
        init_logger();
        let mut service = service(ExecutionMode::NonTransactional);
        let a = new_customer("A");
        let b = new_customer("B");
        a.set_link("Referrer", &b).unwrap();
        b.set_link("Referrer", &a).unwrap();
        service.attach_new(&a).unwrap();
        service.attach_new(&b).unwrap();

        // WHEN
        let report = service.flush_async().await.unwrap();

        // THEN
        let requests = service.transport().requests();
        Expect::new()
            .post("Customers")
            .post("Customers")
            .patch("Customers(1)")
            .check_requests(&requests);
        assert_eq!(
            requests[1].body.to_json().unwrap(),
            props! { "Name" => "A", "Referrer@odata.bind" => "http://host/svc/Customers(1)" }
        );
        assert_eq!(
            requests[2].body.to_json().unwrap(),
            props! { "Referrer@odata.bind" => "http://host/svc/Customers(2)" }
        );
        assert!(report.is_success());
        assert_eq!(report.detached, 2);
        assert!(service.context().is_empty());
    }

    #[tokio::test]
    async fn test_new_media_stream_goes_to_created_entity() {
        let mut service = service(ExecutionMode::NonTransactional);
        let photo = EntityHandle::new(photo_type()).with_properties(props! { "Title" => "Sea" });
        photo.set_media_stream("image/jpeg", vec![1]).unwrap();
        service.attach_new(&photo).unwrap();

        service.flush_async().await.unwrap();

        Expect::new()
            .post("Photos")
            .put("Photos(1)/$value")
            .check_requests(&service.transport().requests());
        assert!(photo.media_change().is_none());
    }

    #[tokio::test]
    async fn test_reference_addition_uses_ref_endpoint() {
        // GIVEN
        let mut service = service(ExecutionMode::NonTransactional);
        let customer =
            EntityHandle::loaded(customer_type(), props! { "ID" => 4, "Name" => "Lee" });
        service.attach_loaded(&customer).unwrap();
        customer
            .add_reference("Orders", "http://host/svc/Orders(7)")
            .unwrap();

        // WHEN
        service.flush_async().await.unwrap();

        // THEN
        let requests = service.transport().requests();
        Expect::new()
            .patch("Customers(4)")
            .post("Customers(4)/Orders/$ref")
            .check_requests(&requests);
        assert_eq!(requests[1].kind, RequestKind::ReferenceAdd);
        assert_eq!(
            requests[1].body.to_json().unwrap(),
            props! { "@odata.id" => "http://host/svc/Orders(7)" }
        );
        assert!(customer.references().is_empty());
    }
}

mod retention {
    use super::*;
    #[allow(unused_imports)]
    use odsync_tests::prelude::assert_eq;

    #[tokio::test]
    async fn test_failed_entity_stays_attached_and_is_resent() {
        // GIVEN
        let mut service = service(ExecutionMode::NonTransactional);
        let x = new_customer("X");
        let y = new_customer("Y");
        service.attach_new(&x).unwrap();
        service.attach_new(&y).unwrap();
        service
            .transport()
            .push_response(Ok(WireResponse::new(500)));

        // WHEN
        let first = service.flush_async().await.unwrap();

        // THEN
        assert_eq!(first.failed(), 1);
        assert_eq!(first.failures[0].content_id, 1);
        assert_eq!(first.failures[0].handle, Some(x.id()));
        assert_eq!(first.retained, 1);
        assert_eq!(service.context().status(&x), Some(AttachedEntityStatus::New));
        assert!(!service.context().is_attached(&y));
        assert!(y.key().is_some());

        // WHEN
        let second = service.flush_async().await.unwrap();

        // THEN
        assert!(second.is_success());
        assert_eq!(second.submitted, 1);
        assert!(service.context().is_empty());
        assert!(x.key().is_some());
    }

    #[tokio::test]
    async fn test_dependent_request_is_skipped_when_its_target_failed() {
        // GIVEN
        let mut service = service(ExecutionMode::NonTransactional);
        let order = EntityHandle::new(order_type()).with_properties(props! { "Total" => 3 });
        let customer = new_customer("Ann");
        order.set_link("Customer", &customer).unwrap();
        service.attach_new(&order).unwrap();
        service
            .transport()
            .push_response(Err(TransportError::new("connection reset")));

        // WHEN
        let report = service.flush_async().await.unwrap();

        // THEN: only the customer create reached the transport.
        assert_eq!(service.transport().requests().len(), 1);
        assert_eq!(report.failed(), 2);
        assert_eq!(report.failures[1].status, None);
        assert_eq!(report.failures[1].message, "unresolved reference $1");
        assert_eq!(service.context().len(), 2);
        assert!(order.link_change("Customer").is_some());
    }

    #[tokio::test]
    async fn test_failed_delete_by_uri_is_kept() {
        // GIVEN
        let mut service = service(ExecutionMode::NonTransactional);
        service.delete_by_uri("Customers(5)").unwrap();
        service.delete_by_uri("Customers(6)").unwrap();
        service
            .transport()
            .push_response(Ok(WireResponse::new(404)));

        // WHEN
        let report = service.flush_async().await.unwrap();

        // THEN
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(
            service.context().deferred_deletes(),
            &["http://host/svc/Customers(5)".to_string()]
        );
    }

    #[tokio::test]
    async fn test_precondition_errors_are_still_raised() {
        let mut service = service(ExecutionMode::NonTransactional);
        let orphan = EntityHandle::new(note_type()).with_properties(props! { "Text" => "?" });
        service.attach_new(&orphan).unwrap();

        let result = service.flush_async().await;

        assert!(matches!(result, Err(SessionError::Compile(_))));
        assert!(service.transport().requests().is_empty());
    }
}
