//! Atomic flushes through one changeset.

use odsync_tests::prelude::*;

fn dirty_customers(service: &mut Service<MockTransport>) -> Vec<EntityHandle> {
    let handles: Vec<EntityHandle> = ["X", "Y"]
        .iter()
        .map(|n| EntityHandle::new(customer_type()).with_properties(props! { "Name" => *n }))
        .collect();
    for handle in &handles {
        service.attach_new(handle).unwrap();
    }
    handles
}

mod failures {
    use super::*;
    #[allow(unused_imports)]
    use odsync_tests::prelude::assert_eq;

    #[test]
    fn test_rejected_envelope_leaves_everything_pending() {
        // GIVEN
        init_logger();
        let mut service = service(ExecutionMode::Transactional);
        let handles = dirty_customers(&mut service);
        let order = EntityHandle::new(order_type());
        order.set_link("Customer", &handles[0]).unwrap();
        service.attach_new(&order).unwrap();
        service
            .transport()
            .push_batch(BatchResponse::new(500, vec![]).with_message("service unavailable"));

        // WHEN
        let result = service.flush();

        // THEN
        assert_eq!(
            result.unwrap_err(),
            SessionError::Executor(ExecutorError::transaction_failure(
                500,
                "service unavailable",
                None
            ))
        );
        assert_eq!(service.context().len(), 3);
        assert!(handles.iter().all(|h| !h.property_changes().is_empty()));
        assert!(order.link_change("Customer").is_some());
    }

    #[test]
    fn test_failed_sub_request_reports_its_content_id() {
        // GIVEN
        let mut service = service(ExecutionMode::Transactional);
        let handles = dirty_customers(&mut service);
        service.transport().push_batch(BatchResponse::new(
            200,
            vec![
                WireResponse::new(201).body(props! { "ID" => 1, "Name" => "X" }),
                WireResponse::new(400).body(props! {
                    "error" => json!({ "code": "", "message": "Name too short" })
                }),
            ],
        ));

        // WHEN
        let result = service.flush();

        // THEN
        assert_eq!(
            result.unwrap_err(),
            SessionError::Executor(ExecutorError::transaction_failure(
                400,
                "Name too short",
                Some(2)
            ))
        );
        assert_eq!(handles[0].key(), None);
        assert_eq!(service.context().len(), 2);
    }

    #[test]
    fn test_missing_sub_responses_are_fatal() {
        let mut service = service(ExecutionMode::Transactional);
        dirty_customers(&mut service);
        service
            .transport()
            .push_batch(BatchResponse::new(202, vec![WireResponse::new(201)]));

        let result = service.flush();

        assert_eq!(
            result.unwrap_err(),
            SessionError::Executor(ExecutorError::inconsistent_response(2, 1))
        );
    }

    #[test]
    fn test_retry_after_failure_resends_the_same_changes() {
        // GIVEN
        let mut service = service(ExecutionMode::Transactional);
        let handles = dirty_customers(&mut service);
        service
            .transport()
            .push_batch(BatchResponse::new(503, vec![]));
        assert!(service.flush().is_err());

        // WHEN
        let report = service.flush().unwrap();

        // THEN
        let changesets = service.transport().changesets();
        assert_eq!(changesets.len(), 2);
        assert_eq!(changesets[0], changesets[1]);
        assert!(report.is_success());
        assert!(service.context().is_empty());
        assert!(handles.iter().all(|h| h.key().is_some()));
    }
}

mod reconciliation {
    use super::*;
    #[allow(unused_imports)]
    use odsync_tests::prelude::assert_eq;

    #[test]
    fn test_update_carries_etag_and_applies_returned_entity() {
        // GIVEN
        let config = ServiceConfig::new(SERVICE_ROOT).with_prefer_return_content(true);
        let mut service = Service::new(config, MockTransport::new()).unwrap();
        let customer = EntityHandle::loaded(
            customer_type(),
            props! { "ID" => 1, "Name" => "Old", "@odata.etag" => "W/\"1\"" },
        );
        service.attach_loaded(&customer).unwrap();
        customer.set_property("Name", "New");
        service.transport().push_batch(BatchResponse::new(
            200,
            vec![WireResponse::new(200)
                .header("ETag", "W/\"2\"")
                .body(props! { "ID" => 1, "Name" => "New", "Rank" => 3 })],
        ));

        // WHEN
        service.flush().unwrap();

        // THEN
        let changeset = service.transport().last_changeset().unwrap();
        let request = &changeset.parts[0].request;
        Expect::new().patch("Customers(1)").check_changeset(&changeset);
        assert_eq!(request.header_value("If-Match"), Some("W/\"1\""));
        assert_eq!(request.header_value("Prefer"), Some("return=representation"));
        assert_eq!(request.body.to_json().unwrap(), props! { "Name" => "New" });
        assert_eq!(customer.payload(), props! { "ID" => 1, "Name" => "New", "Rank" => 3 });
        assert_eq!(customer.etag().as_deref(), Some("W/\"2\""));
        assert!(customer.property_changes().is_empty());
    }

    #[test]
    fn test_no_content_update_keeps_sent_values() {
        let mut service = service(ExecutionMode::Transactional);
        let customer =
            EntityHandle::loaded(customer_type(), props! { "ID" => 1, "Name" => "Old" });
        service.attach_loaded(&customer).unwrap();
        customer.set_property("Name", "New");

        service.flush().unwrap();

        assert_eq!(customer.payload(), props! { "ID" => 1, "Name" => "New" });
        assert!(!customer.is_changed());
    }

    #[test]
    fn test_clean_persisted_target_is_bound_by_uri() {
        // GIVEN
        let mut service = service(ExecutionMode::Transactional);
        let customer =
            EntityHandle::loaded(customer_type(), props! { "ID" => 8, "Name" => "Kim" });
        let order = EntityHandle::new(order_type()).with_properties(props! { "Total" => 5 });
        order.set_link("Customer", &customer).unwrap();
        service.attach_new(&order).unwrap();

        // WHEN
        service.flush().unwrap();

        // THEN: the customer is attached as LINKED and sends nothing.
        let changeset = service.transport().last_changeset().unwrap();
        Expect::new().post("Orders").check_changeset(&changeset);
        assert_eq!(
            changeset.parts[0].request.body.to_json().unwrap(),
            props! { "Total" => 5, "Customer@odata.bind" => "http://host/svc/Customers(8)" }
        );
        assert!(service.context().is_empty());
    }
}
