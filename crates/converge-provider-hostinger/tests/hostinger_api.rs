//! HTTP contract tests against a mock Hostinger endpoint

use std::sync::Arc;

use converge_core::traits::{
    CatalogApi, CatalogKind, GroupFilter, PurchaseRequest, SetupRequest, VirtualMachineApi,
    ZoneApi, ZoneEntry, ZoneUpdate,
};
use converge_core::{
    ApiConfig, DeclaredRecord, Error, RecordType, RetractOutcome, ZoneConfig, ZoneReconciler,
};
use converge_provider_hostinger::{CLIENT_USER_AGENT, HostingerClient};
use serde_json::json;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> HostingerClient {
    let config = ApiConfig::new("test-token").with_base_url(server.uri());
    HostingerClient::from_config(&config).unwrap()
}

#[tokio::test]
async fn get_zone_sends_bearer_token_and_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dns/v1/zones/example.com"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("user-agent", CLIENT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "www", "type": "A", "ttl": 300,
             "records": [{"content": "1.2.3.4", "is_disabled": false},
                         {"content": "5.6.7.8"}]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let groups = client(&server).await.get_zone("example.com").await.unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].record_type, "A");
    assert_eq!(groups[0].ttl, 300);
    assert_eq!(groups[0].records[1].content, "5.6.7.8");
    assert!(!groups[0].records[1].is_disabled);
}

#[tokio::test]
async fn put_zone_sends_overwrite_flag_and_entries() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/dns/v1/zones/example.com"))
        .and(body_json(json!({
            "overwrite": false,
            "zone": [{"name": "www", "type": "A", "ttl": 14400,
                      "records": [{"content": "1.2.3.4"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let update = ZoneUpdate {
        overwrite: false,
        entries: vec![ZoneEntry::new("www", "A", 14400, ["1.2.3.4".to_string()])],
    };
    client(&server)
        .await
        .put_zone("example.com", &update)
        .await
        .unwrap();
}

#[tokio::test]
async fn delete_zone_groups_accepts_202() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/dns/v1/zones/example.com"))
        .and(body_json(json!({"filters": [{"name": "www", "type": "A"}]})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let filters = vec![GroupFilter {
        name: "www".to_string(),
        record_type: "A".to_string(),
    }];
    client(&server)
        .await
        .delete_zone_groups("example.com", &filters)
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_instance_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/vps/v1/virtual-machines/42"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    let err = client(&server).await.get_instance(42).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn rejected_token_maps_to_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/vps/v1/virtual-machines"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server).await.list_instances().await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
    assert!(!err.to_string().contains("test-token"));
}

#[tokio::test]
async fn throttling_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/billing/v1/payment-methods"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .list_payment_methods()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimited(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unexpected_status_keeps_operation_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/vps/v1/virtual-machines/7/setup"))
        .respond_with(ResponseTemplate::new(422).set_body_string("template unavailable"))
        .mount(&server)
        .await;

    let request = SetupRequest {
        data_center_id: 1,
        template_id: 1002,
        password: None,
        hostname: None,
        post_install_script_id: None,
    };
    let err = client(&server)
        .await
        .setup_instance(7, &request)
        .await
        .unwrap_err();

    match err {
        Error::Api {
            operation,
            status,
            body,
        } => {
            assert_eq!(operation, "setup virtual machine 7");
            assert_eq!(status, 422);
            assert_eq!(body, "template unavailable");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn failures_name_the_resource_they_concern() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let gateway = client(&server).await;
    let setup = SetupRequest {
        data_center_id: 1,
        template_id: 1002,
        password: None,
        hostname: None,
        post_install_script_id: None,
    };

    let setup_err = gateway.setup_instance(4242, &setup).await.unwrap_err();
    assert!(setup_err.to_string().contains("4242"), "{setup_err}");

    let zone_err = gateway.get_zone("example.com").await.unwrap_err();
    assert!(zone_err.to_string().contains("example.com"), "{zone_err}");

    let filters = vec![GroupFilter {
        name: "www".to_string(),
        record_type: "A".to_string(),
    }];
    let delete_err = gateway
        .delete_zone_groups("example.com", &filters)
        .await
        .unwrap_err();
    assert!(delete_err.to_string().contains("example.com"), "{delete_err}");

    let cancel_err = gateway.cancel_subscription("sub-777").await.unwrap_err();
    assert!(cancel_err.to_string().contains("sub-777"), "{cancel_err}");

    let attach_err = gateway.attach_credentials(4242, &[12]).await.unwrap_err();
    assert!(attach_err.to_string().contains("4242"), "{attach_err}");

    let hostname_err = gateway
        .update_hostname(4242, "web.example.com")
        .await
        .unwrap_err();
    assert!(hostname_err.to_string().contains("4242"), "{hostname_err}");

    let order_err = gateway
        .order_instance("hostingercom-vps-kvm2-usd-1m", 7)
        .await
        .unwrap_err();
    assert!(
        order_err.to_string().contains("hostingercom-vps-kvm2-usd-1m"),
        "{order_err}"
    );
}

#[tokio::test]
async fn missing_instance_message_names_the_instance() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/vps/v1/virtual-machines/42/public-keys"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .attached_credential_ids(42)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("42"));
}

#[tokio::test]
async fn plan_catalog_is_flattened_to_price_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/billing/v1/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "hostingercom-vps-kvm2", "name": "KVM 2",
             "prices": [{"id": "hostingercom-vps-kvm2-usd-1m"},
                        {"id": "hostingercom-vps-kvm2-usd-12m"}]}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vps/v1/templates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": 1002, "name": "Ubuntu 24.04"}])),
        )
        .mount(&server)
        .await;

    let gateway = client(&server).await;
    let plans = gateway.list_catalog(CatalogKind::Plans).await.unwrap();
    let templates = gateway.list_catalog(CatalogKind::Templates).await.unwrap();

    let ids: Vec<&str> = plans.iter().map(|entry| entry.id.as_str()).collect();
    assert_eq!(
        ids,
        ["hostingercom-vps-kvm2-usd-1m", "hostingercom-vps-kvm2-usd-12m"]
    );
    assert_eq!(templates[0].id, "1002");
    assert_eq!(templates[0].name, "Ubuntu 24.04");
}

#[tokio::test]
async fn public_keys_are_listed_and_attached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/vps/v1/virtual-machines/7/public-keys"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": [{"id": 11, "name": "laptop"}], "meta": {}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/vps/v1/public-keys/attach/7"))
        .and(body_json(json!({"ids": [12, 13]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = client(&server).await;
    assert_eq!(gateway.attached_credential_ids(7).await.unwrap(), vec![11]);
    gateway.attach_credentials(7, &[12, 13]).await.unwrap();
}

#[tokio::test]
async fn cancel_subscription_accepts_204() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/billing/v1/subscriptions/Azz1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .cancel_subscription("Azz1")
        .await
        .unwrap();
}

#[tokio::test]
async fn purchase_without_instance_id_is_not_materialized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/vps/v1/virtual-machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "order": {"id": 9, "subscription_id": "Azz1", "status": "processing"},
            "virtual_machine": {"id": 0, "state": "initial"}
        })))
        .mount(&server)
        .await;

    let request = PurchaseRequest {
        item_id: "hostingercom-vps-kvm2-usd-1m".to_string(),
        payment_method_id: Some(7),
        setup: SetupRequest {
            data_center_id: 1,
            template_id: 1002,
            password: Some("correct horse".to_string()),
            hostname: Some("web.example.com".to_string()),
            post_install_script_id: None,
        },
    };
    let response = client(&server)
        .await
        .purchase_instance(&request)
        .await
        .unwrap();

    assert_eq!(response.order.subscription_id, "Azz1");
    assert!(response.virtual_machine.is_none());
}

#[tokio::test]
async fn legacy_order_returns_subscription_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/billing/v1/orders"))
        .and(body_json(json!({
            "payment_method_id": 7,
            "items": [{"item_id": "hostingercom-vps-kvm2-usd-1m", "quantity": 1}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 9, "subscription_id": "Azz1", "status": "paid"})),
        )
        .mount(&server)
        .await;

    let subscription = client(&server)
        .await
        .order_instance("hostingercom-vps-kvm2-usd-1m", 7)
        .await
        .unwrap();
    assert_eq!(subscription, "Azz1");
}

#[tokio::test]
async fn reconciler_retracts_one_value_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dns/v1/zones/example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "www", "type": "A", "ttl": 300,
             "records": [{"content": "1.2.3.4"}, {"content": "5.6.7.8"}]}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/dns/v1/zones/example.com"))
        .and(body_json(json!({"filters": [{"name": "www", "type": "A"}]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/dns/v1/zones/example.com"))
        .and(body_json(json!({
            "overwrite": false,
            "zone": [{"name": "www", "type": "A", "ttl": 300,
                      "records": [{"content": "5.6.7.8"}]}]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = ZoneConfig {
        propagation_wait_secs: 0,
        ..ZoneConfig::default()
    };
    let reconciler = ZoneReconciler::new(Arc::new(client(&server).await), config);
    let id = DeclaredRecord::new("www", RecordType::A, "1.2.3.4").record_id();

    let outcome = reconciler.retract("example.com", &id).await.unwrap();
    assert_eq!(
        outcome,
        RetractOutcome::Rewritten {
            kept: vec!["5.6.7.8".to_string()]
        }
    );
}
