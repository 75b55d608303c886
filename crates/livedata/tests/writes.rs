//! Tenant-scoped writes and their interaction with live subscriptions.

mod common;

use std::time::Duration;

use averzo_livedata::error::LiveDataError;
use averzo_livedata::events::Operation;
use averzo_livedata::path::LogicalPath;
use averzo_livedata::query::{DocumentRef, QueryDescriptor};
use averzo_livedata::subscription::CollectionSubscription;
use averzo_livedata::writes::DocumentWriter;
use common::*;
use serde_json::{Map, Value, json};

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_write_is_seen_by_live_query() {
    let test = TestContext::new();
    let subscription = CollectionSubscription::with_query(
        test.ctx.clone(),
        Some(QueryDescriptor::collection("users/u123/paymentMethods")),
    );
    assert_eq!(subscription.state().data.map(|r| r.len()), Some(0));

    let writer = DocumentWriter::new(test.ctx.clone());
    let id = writer
        .add(
            &LogicalPath::parse("users/u123/paymentMethods"),
            fields(json!({"brand": "visa"})),
        )
        .await
        .unwrap();

    assert_eq!(ids(&subscription.state().data.unwrap()), vec![id]);
}

#[tokio::test]
async fn test_merge_set_keeps_other_fields() {
    let test = TestContext::new();
    seed_products(&test.backend);
    let writer = DocumentWriter::new(test.ctx.clone());

    writer
        .set(&DocumentRef::new("products", "p1"), fields(json!({"price": 30})), true)
        .await
        .unwrap();

    let stored = test.backend.document(PRODUCTS, "p1").unwrap();
    assert_eq!(stored["price"], json!(30));
    assert_eq!(stored["name"], json!("Lamp"));
}

#[tokio::test]
async fn test_denied_update_emits_update_event() {
    let test = TestContext::new();
    seed_products(&test.backend);
    test.backend.deny(PRODUCTS, &[Operation::Update]);

    let result = DocumentWriter::new(test.ctx.clone())
        .update(&DocumentRef::new("products", "p2"), fields(json!({"price": 1})))
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, LiveDataError::Permission(_)));
    assert!(err.to_string().contains("\"operation\": \"update\""));

    let events = test.recorded_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].operation, Operation::Update);
    assert_eq!(events[0].request_resource_data, Some(json!({"price": 1})));
}

#[tokio::test]
async fn test_non_blocking_failure_only_reaches_bus() {
    let test = TestContext::new();
    test.backend.deny("", &[Operation::Delete]);

    let handle = DocumentWriter::new(test.ctx.clone())
        .delete_non_blocking(DocumentRef::new("products", "p1"))
        .expect("inside runtime");
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("write finished")
        .expect("task joined");

    let events = test.recorded_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].operation, Operation::Delete);
    assert_eq!(events[0].path, format!("{}/p1", PRODUCTS));
    assert_eq!(events[0].request_resource_data, None);
}

#[tokio::test]
async fn test_non_blocking_set_and_add() {
    let test = TestContext::new();
    let writer = DocumentWriter::new(test.ctx.clone());

    let set = writer
        .set_non_blocking(
            DocumentRef::new("products", "p7"),
            fields(json!({"name": "Desk"})),
            false,
        )
        .unwrap();
    let add = writer
        .add_non_blocking(LogicalPath::parse("products"), fields(json!({"name": "Chair"})))
        .unwrap();
    set.await.unwrap();
    add.await.unwrap();

    assert_eq!(test.backend.count(PRODUCTS), 2);
    assert!(test.recorded_events().is_empty());
}
