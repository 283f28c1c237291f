//! Integration tests for the transport order saga.

use std::sync::Arc;

use common::{DealId, OrderId};
use crm::{
    AttachmentSource, DEALS_MODULE, InMemoryCrmClient, InMemoryFileFetcher, InMemoryNotifier,
    VEHICLES_MODULE,
};
use order_store::{InMemoryOrderStore, OrderStore};
use saga::{
    OrderResponse, ReconcileResponse, ReconciliationUpdater, SagaCoordinator, SagaSettings,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use url::Url;

struct TestHarness {
    coordinator: SagaCoordinator<InMemoryOrderStore>,
    store: InMemoryOrderStore,
    crm: InMemoryCrmClient,
    fetcher: InMemoryFileFetcher,
    notifier: InMemoryNotifier,
    scratch: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryOrderStore::new();
        let crm = InMemoryCrmClient::new();
        let fetcher = InMemoryFileFetcher::new();
        let notifier = InMemoryNotifier::new();
        let scratch = tempfile::tempdir().unwrap();

        let settings = SagaSettings {
            scratch_dir: scratch.path().to_path_buf(),
            crm_web_url: "https://crm.example.com/tab/Potentials".to_string(),
            file_source_base: Some(Url::parse("https://files.example.com/uploads/").unwrap()),
            ..SagaSettings::default()
        };

        let coordinator = SagaCoordinator::new(
            store.clone(),
            Arc::new(crm.clone()),
            Arc::new(fetcher.clone()),
            Arc::new(notifier.clone()),
            settings,
        );

        Self {
            coordinator,
            store,
            crm,
            fetcher,
            notifier,
            scratch,
        }
    }

    async fn submit(&self, body: Value) -> OrderResponse {
        self.coordinator.create_order_from_json(body).await
    }

    fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.scratch.path()).unwrap().next().is_none()
    }
}

fn vehicle(vin: &str, release_form: Value) -> Value {
    json!({
        "Make": "Toyota",
        "Model": "RAV4",
        "Trim": "XLE",
        "VIN": vin,
        "ReleaseForm": release_form,
        "Color": "Silver"
    })
}

fn order_body(vehicles: Vec<Value>) -> Value {
    json!({
        "Customer_id": "C-200",
        "Customer_name": "Lakeshore Auto",
        "Pickup_Location": "55 Bloor St, Toronto, ON",
        "Dropoff_Location": "Ottawa, ON",
        "Special_Instruction": "Gate code 1234",
        "Vehicles": vehicles
    })
}

#[tokio::test]
async fn test_end_to_end_two_vehicles_one_release_form() {
    let h = TestHarness::new();

    let response = h
        .submit(order_body(vec![
            vehicle("VIN-A", json!("forms/release-a.pdf")),
            vehicle("VIN-B", Value::Null),
        ]))
        .await;

    let OrderResponse::Created(created) = response else {
        panic!("expected success, got {response:?}");
    };
    assert_eq!(created.code, 201);
    assert_eq!(created.order_label, "#1");
    assert_eq!(created.remote_deal_id, DealId::new("CRM-0001"));
    assert_eq!(created.vehicles.len(), 2);
    assert_eq!(created.vehicles[0]["Vehicle_ID"], json!("CRM-0002"));
    assert_eq!(created.vehicles[1]["Vehicle_ID"], json!("CRM-0003"));
    for vehicle in &created.vehicles {
        assert!(!vehicle.contains_key("Layout"));
        assert!(!vehicle.contains_key("Source"));
        assert_eq!(vehicle["Deal_ID"], json!("CRM-0001"));
    }

    // Exactly one deal-level and one vehicle-level attachment
    let deal_attachments = h.crm.attachments(DEALS_MODULE);
    assert_eq!(deal_attachments.len(), 1);
    assert_eq!(deal_attachments[0].record_id, "CRM-0001");
    assert!(matches!(deal_attachments[0].source, AttachmentSource::File(_)));

    let vehicle_attachments = h.crm.attachments(VEHICLES_MODULE);
    assert_eq!(vehicle_attachments.len(), 1);
    assert_eq!(vehicle_attachments[0].record_id, "CRM-0002");
    assert_eq!(
        vehicle_attachments[0].source,
        AttachmentSource::Url("https://files.example.com/uploads/forms/release-a.pdf".to_string())
    );

    // Committed with the deal linked
    let order = h
        .store
        .find_by_deal_id(&DealId::new("CRM-0001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.id, OrderId::new(1));
    assert_eq!(order.status.as_deref(), Some("Pending"));

    let deal = h.crm.record(DEALS_MODULE, "CRM-0001").unwrap();
    assert_eq!(deal["Deal_Name"], json!("#1"));
    assert_eq!(deal["Tax_Province"], json!("ON"));

    assert!(h.scratch_is_empty());
    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("<https://crm.example.com/tab/Potentials/CRM-0001|View Order Details>"));
}

#[tokio::test]
async fn test_no_release_forms_completes_without_attachments() {
    let h = TestHarness::new();

    let response = h
        .submit(order_body(vec![
            vehicle("VIN-A", Value::Null),
            vehicle("VIN-B", json!("")),
            vehicle("VIN-C", json!("null")),
        ]))
        .await;

    assert_eq!(response.code(), 201);
    assert!(h.crm.attachments(DEALS_MODULE).is_empty());
    assert!(h.crm.attachments(VEHICLES_MODULE).is_empty());
    assert!(h.fetcher.fetched().is_empty());
}

#[tokio::test]
async fn test_persistence_failure_makes_no_remote_calls() {
    let h = TestHarness::new();
    h.store.set_fail_on_insert(true).await;

    let response = h
        .submit(order_body(vec![vehicle("VIN-A", json!("forms/a.pdf"))]))
        .await;

    let OrderResponse::Failed(failure) = response else {
        panic!("expected failure");
    };
    assert_eq!(failure.code, 500);
    assert_eq!(failure.message, "Error creating order");
    assert_eq!(h.crm.call_count(), 0);
    assert!(h.fetcher.fetched().is_empty());
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_deal_failure_rolls_back_order() {
    let h = TestHarness::new();
    h.crm.set_fail_on_create(DEALS_MODULE, true);

    let response = h
        .submit(order_body(vec![vehicle("VIN-A", Value::Null)]))
        .await;

    assert_eq!(response.code(), 500);
    assert_eq!(h.store.rollback_count().await, 1);
    assert_eq!(h.store.commit_count().await, 0);
    assert!(h.store.get_order(OrderId::new(1)).await.unwrap().is_none());
    assert_eq!(h.crm.record_count(VEHICLES_MODULE), 0);
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_vehicle_batch_failure_is_fatal_and_orphans_deal() {
    let h = TestHarness::new();
    h.crm.set_fail_on_create(VEHICLES_MODULE, true);

    let response = h
        .submit(order_body(vec![vehicle("VIN-A", json!("forms/a.pdf"))]))
        .await;

    let OrderResponse::Failed(failure) = response else {
        panic!("expected failure");
    };
    assert_eq!(failure.code, 500);
    assert!(failure.error.contains("CRM-0001"));

    // The order is gone locally but the deal stays in the CRM
    assert_eq!(h.store.order_count().await, 0);
    assert_eq!(h.store.rollback_count().await, 1);
    assert_eq!(h.crm.record_count(DEALS_MODULE), 1);
    assert!(h.crm.record(DEALS_MODULE, "CRM-0001").is_some());
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_link_failure_drops_transaction_and_orphans_deal() {
    let h = TestHarness::new();
    h.store.set_fail_on_link(true).await;

    let response = h
        .submit(order_body(vec![vehicle("VIN-A", Value::Null)]))
        .await;

    assert_eq!(response.code(), 500);
    assert_eq!(h.store.order_count().await, 0);
    assert_eq!(h.store.commit_count().await, 0);
    assert_eq!(h.crm.record_count(DEALS_MODULE), 1);
    assert_eq!(h.crm.record_count(VEHICLES_MODULE), 1);
}

#[tokio::test]
async fn test_rejected_vehicle_record_is_not_fatal() {
    let h = TestHarness::new();
    h.crm.reject_record(VEHICLES_MODULE, 1);

    let response = h
        .submit(order_body(vec![
            vehicle("VIN-A", Value::Null),
            vehicle("VIN-B", json!("forms/b.pdf")),
        ]))
        .await;

    let OrderResponse::Created(created) = response else {
        panic!("expected success, got {response:?}");
    };
    assert_eq!(created.vehicles[0]["Vehicle_ID"], json!("CRM-0002"));
    assert_eq!(created.vehicles[1]["Vehicle_ID"], Value::Null);
    // Rejected vehicle gets no attachment; the deal still gets its file
    assert!(h.crm.attachments(VEHICLES_MODULE).is_empty());
    assert_eq!(h.crm.attachments(DEALS_MODULE).len(), 1);
}

#[tokio::test]
async fn test_attachment_failures_are_not_fatal() {
    let h = TestHarness::new();
    h.crm.set_fail_on_attach(true);

    let response = h
        .submit(order_body(vec![vehicle("VIN-A", json!("forms/a.pdf"))]))
        .await;

    assert_eq!(response.code(), 201);
    assert_eq!(h.store.order_count().await, 1);
    assert!(h.scratch_is_empty());
}

#[tokio::test]
async fn test_fetch_failure_is_not_fatal() {
    let h = TestHarness::new();
    h.fetcher.set_fail_on_fetch(true);

    let response = h
        .submit(order_body(vec![vehicle("VIN-A", json!("forms/a.pdf"))]))
        .await;

    assert_eq!(response.code(), 201);
    assert!(h.crm.attachments(DEALS_MODULE).is_empty());
    // Vehicle attachments go by URL and need no download
    assert_eq!(h.crm.attachments(VEHICLES_MODULE).len(), 1);
}

#[tokio::test]
async fn test_unresolvable_reference_skips_deal_attachments() {
    let h = TestHarness::new();

    let response = h
        .submit(order_body(vec![
            vehicle("VIN-A", json!("ftp://files.example.com/a.pdf")),
            vehicle("VIN-B", json!("forms/b.pdf")),
        ]))
        .await;

    assert_eq!(response.code(), 201);
    assert!(h.crm.attachments(DEALS_MODULE).is_empty());
    let vehicle_attachments = h.crm.attachments(VEHICLES_MODULE);
    assert_eq!(vehicle_attachments.len(), 1);
    assert_eq!(vehicle_attachments[0].record_id, "CRM-0003");
}

#[tokio::test]
async fn test_non_string_release_form_skips_attachments() {
    let h = TestHarness::new();

    let response = h
        .submit(order_body(vec![
            vehicle("VIN-A", json!(12345)),
            vehicle("VIN-B", json!({"path": "forms/b.pdf"})),
        ]))
        .await;

    let OrderResponse::Created(created) = response else {
        panic!("expected success, got {response:?}");
    };
    assert_eq!(created.code, 201);
    assert_eq!(created.vehicles.len(), 2);
    assert!(h.crm.attachments(DEALS_MODULE).is_empty());
    assert!(h.crm.attachments(VEHICLES_MODULE).is_empty());
    assert!(h.fetcher.fetched().is_empty());
    assert_eq!(h.store.order_count().await, 1);
}

#[tokio::test]
async fn test_notifier_failure_keeps_success() {
    let h = TestHarness::new();
    h.notifier.set_fail_on_post(true);

    let response = h
        .submit(order_body(vec![vehicle("VIN-A", Value::Null)]))
        .await;

    assert_eq!(response.code(), 201);
    assert_eq!(h.store.order_count().await, 1);
}

#[tokio::test]
async fn test_created_order_can_be_reconciled() {
    let h = TestHarness::new();
    let response = h
        .submit(order_body(vec![vehicle("VIN-A", Value::Null)]))
        .await;
    assert_eq!(response.code(), 201);

    let updater = ReconciliationUpdater::new(h.store.clone());
    let response = updater
        .update(json!({
            "DealID": "CRM-0001",
            "Status": "Dispatched",
            "CarrierName": "Northbound Haulage",
            "CustomerPrice": "1500.00",
            "Customer_Name": "ignored"
        }))
        .await;
    assert_eq!(response, ReconcileResponse::updated());

    let order = h
        .store
        .find_by_deal_id(&DealId::new("CRM-0001"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status.as_deref(), Some("Dispatched"));
    assert_eq!(order.carrier_name.as_deref(), Some("Northbound Haulage"));
    assert_eq!(order.customer_price, Some(1500.0));
    assert_eq!(order.customer_name, "Lakeshore Auto");
}
