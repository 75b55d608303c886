//! Document subscription lifecycle against the in-memory backend.

mod common;

use averzo_livedata::backend::DocumentSnapshot;
use averzo_livedata::error::StoreError;
use averzo_livedata::events::Operation;
use averzo_livedata::query::DocumentRef;
use averzo_livedata::subscription::{DocumentSubscription, LiveState};
use common::*;
use serde::Deserialize;
use serde_json::{Map, json};

#[derive(Debug, Deserialize, PartialEq)]
struct Card {
    brand: String,
    last4: String,
}

#[test]
fn test_missing_document_is_empty_not_error() {
    let test = TestContext::new();
    let subscription = DocumentSubscription::with_reference(
        test.ctx.clone(),
        Some(DocumentRef::new("products", "does-not-exist")),
    );

    assert_eq!(subscription.state(), LiveState::idle());
    assert!(test.recorded_events().is_empty());
}

#[test]
fn test_user_document_deserializes() {
    let test = TestContext::new();
    seed_payment_methods(&test.backend);

    let subscription = DocumentSubscription::with_reference(
        test.ctx.clone(),
        Some(DocumentRef::new("users/u123/paymentMethods", "card1")),
    );

    let record = subscription.state().data.unwrap();
    assert_eq!(record.id, "card1");
    assert_eq!(
        record.deserialize::<Card>().unwrap(),
        Card {
            brand: "visa".to_string(),
            last4: "4242".to_string(),
        }
    );
}

#[test]
fn test_document_deleted_after_delivery() {
    let test = TestContext::new();
    seed_products(&test.backend);
    let subscription = DocumentSubscription::with_reference(
        test.ctx.clone(),
        Some(DocumentRef::new("products", "p1")),
    );
    assert!(subscription.state().data.is_some());

    test.backend.remove(PRODUCTS, "p1");
    let state = subscription.state();
    assert_eq!(state.data, None);
    assert!(state.error.is_none());
}

#[test]
fn test_reference_change_ignores_old_document() {
    let test = TestContext::new();
    seed_products(&test.backend);

    let mut subscription = DocumentSubscription::with_reference(
        test.ctx.clone(),
        Some(DocumentRef::new("products", "p1")),
    );
    subscription.set_reference(Some(DocumentRef::new("products", "p2")));
    assert_eq!(test.backend.released_listeners(), 1);

    test.backend.put(PRODUCTS, "p1", json!({"name": "Changed"}));
    let record = subscription.state().data.unwrap();
    assert_eq!(record.id, "p2");
    assert_eq!(record.get("name"), Some(&json!("Mug")));
}

#[test]
fn test_denied_get_emits_once() {
    let test = TestContext::new();
    test.backend.deny("artifacts/proj1/users", &[Operation::Get]);

    let subscription = DocumentSubscription::with_reference(
        test.ctx.clone(),
        Some(DocumentRef::new("users/u123/paymentMethods", "card1")),
    );

    let state = subscription.state();
    assert!(state.error.is_some());
    assert!(!state.loading);

    let events = test.recorded_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].operation, Operation::Get);
    assert_eq!(events[0].path, format!("{}/card1", PAYMENT_METHODS));
}

#[test]
fn test_revoked_access_keeps_last_document() {
    let test = TestContext::new();
    seed_products(&test.backend);
    let subscription = DocumentSubscription::with_reference(
        test.ctx.clone(),
        Some(DocumentRef::new("products", "p3")),
    );

    test.backend
        .fail_listeners(PRODUCTS, StoreError::permission_denied("revoked"));

    let state = subscription.state();
    assert_eq!(state.data.map(|record| record.id), Some("p3".to_string()));
    assert!(state.error.is_some());
    assert_eq!(test.recorded_events().len(), 1);
}

#[test]
fn test_reference_change_resets_state_and_ignores_late_callbacks() {
    let test = DeferredContext::new();
    let mut subscription = DocumentSubscription::new(test.ctx.clone());

    subscription.set_reference(Some(DocumentRef::new("products", "p1")));
    assert_eq!(subscription.state(), LiveState::pending(false));
    assert_eq!(test.source.document_path(0).to_string(), format!("{}/p1", PRODUCTS));

    let old = test.source.document_callback(0);
    old(Ok(DocumentSnapshot::existing("p1", Map::new())));
    assert_eq!(subscription.state().data.map(|record| record.id), Some("p1".to_string()));

    subscription.set_reference(Some(DocumentRef::new("products", "p2")));
    assert_eq!(test.source.released(), 1);
    assert_eq!(subscription.state(), LiveState::pending(false));

    old(Ok(DocumentSnapshot::existing("p1", Map::new())));
    old(Err(StoreError::permission_denied("late")));
    assert_eq!(subscription.state(), LiveState::pending(false));
    assert!(test.recorded_events().is_empty());

    test.source.document_callback(1)(Ok(DocumentSnapshot::missing("p2")));
    assert_eq!(subscription.state(), LiveState::idle());
}
