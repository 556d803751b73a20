//! Stripe webhook: signature checks, plan transitions and redelivery.

use axum::http::StatusCode;
use serde_json::{Value, json};

mod common;
use common::*;

use omega::entitlements::{Entitlement, evaluate};

fn checkout_event(event_id: &str, email: &str, mode: &str, price_id: Option<&str>) -> Value {
    let mut session = json!({
        "id": "cs_test_1",
        "mode": mode,
        "customer": "cus_123",
        "customer_email": email,
        "subscription": if mode == "subscription" { json!("sub_123") } else { Value::Null },
    });
    if let Some(price_id) = price_id {
        session["line_items"] = json!({ "data": [{ "price": { "id": price_id } }] });
    }
    json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": session }
    })
}

fn subscription_event(event_id: &str, event_type: &str, price_id: &str) -> Value {
    json!({
        "id": event_id,
        "type": event_type,
        "data": { "object": {
            "id": "sub_123",
            "customer": "cus_123",
            "status": "active",
            "current_period_end": 1_900_000_000,
            "items": { "data": [{ "price": { "id": price_id, "unit_amount": 999 } }] }
        }}
    })
}

#[tokio::test]
async fn test_lifetime_checkout_upgrades_trial() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");

    let (status, _) = post_webhook(
        &t.app,
        &checkout_event("evt_1", "ADA@example.com", "payment", Some(PRICE_LIFETIME)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let account = reload(&t.state, &account);
    assert_eq!(account.plan, Some(Plan::Lifetime));
    assert_eq!(account.max_devices, 3);
    assert_eq!(account.trial_expires_at, None);
    assert_eq!(account.subscription_id, None);
    assert_eq!(account.stripe_customer_id.as_deref(), Some("cus_123"));
}

#[tokio::test]
async fn test_subscription_checkout_stores_subscription() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");

    let (status, _) = post_webhook(
        &t.app,
        &checkout_event("evt_1", "ada@example.com", "subscription", Some(PRICE_BUSINESS_YEARLY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let account = reload(&t.state, &account);
    assert_eq!(account.plan, Some(Plan::Business));
    assert_eq!(account.max_devices, 10);
    assert_eq!(account.subscription_id.as_deref(), Some("sub_123"));
    assert!(account.plan_updated_at.is_some());
}

#[tokio::test]
async fn test_redelivered_event_is_acknowledged_once() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    let event = checkout_event("evt_dup", "ada@example.com", "subscription", Some(PRICE_PRO_MONTHLY));

    let (status, _) = post_webhook(&t.app, &event).await;
    assert_eq!(status, StatusCode::OK);
    let first = reload(&t.state, &account);

    let (status, _) = post_webhook(&t.app, &event).await;
    assert_eq!(status, StatusCode::OK);
    let second = reload(&t.state, &account);

    assert_eq!(first.plan, Some(Plan::Pro));
    assert_eq!(first.updated_at, second.updated_at);
    let conn = t.state.db.get().unwrap();
    assert!(queries::webhook_event_recorded(&conn, "stripe", "evt_dup").unwrap());
}

#[tokio::test]
async fn test_unmatched_price_changes_nothing() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");

    let (status, _) = post_webhook(
        &t.app,
        &checkout_event("evt_1", "ada@example.com", "subscription", Some("price_unknown")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let after = reload(&t.state, &account);
    assert_eq!(after.plan, Some(Plan::Trial));
    assert_eq!(after.trial_expires_at, account.trial_expires_at);
}

#[tokio::test]
async fn test_lifetime_price_in_subscription_mode_is_ignored() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");

    post_webhook(
        &t.app,
        &checkout_event("evt_1", "ada@example.com", "subscription", Some(PRICE_LIFETIME)),
    )
    .await;

    assert_eq!(reload(&t.state, &account).plan, Some(Plan::Trial));
}

#[tokio::test]
async fn test_subscription_update_switches_plan_by_customer() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    set_plan(&t.state, &account, Plan::Pro);
    set_customer(&t.state, &account, "cus_123", Some("sub_old"));

    let (status, _) = post_webhook(
        &t.app,
        &subscription_event("evt_2", "customer.subscription.updated", PRICE_BUSINESS_MONTHLY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let account = reload(&t.state, &account);
    assert_eq!(account.plan, Some(Plan::Business));
    assert_eq!(account.max_devices, 10);
    assert_eq!(account.subscription_id.as_deref(), Some("sub_123"));
}

#[tokio::test]
async fn test_cancellation_revokes_access_and_converges() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    set_plan(&t.state, &account, Plan::Business);
    set_customer(&t.state, &account, "cus_123", Some("sub_123"));

    let (status, _) = post_webhook(
        &t.app,
        &subscription_event("evt_3", "customer.subscription.deleted", PRICE_BUSINESS_MONTHLY),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let revoked = reload(&t.state, &account);
    let now = chrono::Utc::now().timestamp();
    assert_eq!(revoked.plan, Some(Plan::Trial));
    assert_eq!(revoked.max_devices, 1);
    assert_eq!(revoked.subscription_id, None);
    assert!(revoked.trial_expires_at.unwrap() < now);
    assert!(matches!(evaluate(&revoked, now), Entitlement::TrialExpired { .. }));

    let token = token_for(&t.state, &revoked);
    let (status, body) = send(&t.app, json_request("POST", "/license/validate", Some(&token), json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["trial_expired"], true);

    // Same cancellation under a new event id must not move the expiry.
    post_webhook(
        &t.app,
        &subscription_event("evt_4", "customer.subscription.deleted", PRICE_BUSINESS_MONTHLY),
    )
    .await;
    let replayed = reload(&t.state, &account);
    assert_eq!(replayed.trial_expires_at, revoked.trial_expires_at);
    assert_eq!(replayed.updated_at, revoked.updated_at);
}

#[tokio::test]
async fn test_signature_is_required_and_checked() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");
    let payload = checkout_event("evt_1", "ada@example.com", "payment", Some(PRICE_LIFETIME)).to_string();
    let now = chrono::Utc::now().timestamp();

    let missing = axum::http::Request::builder()
        .method("POST")
        .uri("/webhook/stripe")
        .body(axum::body::Body::from(payload.clone()))
        .unwrap();
    let (status, _) = send(&t.app, missing).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong_secret = stripe_signature("whsec_other", now, &payload);
    let (status, _) = send(&t.app, webhook_request(&payload, &wrong_secret)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let stale = stripe_signature(TEST_WEBHOOK_SECRET, now - 600, &payload);
    let (status, _) = send(&t.app, webhook_request(&payload, &stale)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&t.app, webhook_request(&payload, "garbage")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(reload(&t.state, &account).plan, Some(Plan::Trial));
}

#[tokio::test]
async fn test_missing_price_without_stripe_client_is_retryable() {
    let t = test_app();
    let account = create_account(&t.state, "ada@example.com");

    let (status, _) = post_webhook(&t.app, &checkout_event("evt_1", "ada@example.com", "payment", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(reload(&t.state, &account).plan, Some(Plan::Trial));
    let conn = t.state.db.get().unwrap();
    assert!(!queries::webhook_event_recorded(&conn, "stripe", "evt_1").unwrap());
}

#[tokio::test]
async fn test_unknown_event_types_are_acknowledged() {
    let t = test_app();
    let event = json!({ "id": "evt_9", "type": "invoice.paid", "data": { "object": {} } });

    let (status, _) = post_webhook(&t.app, &event).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_checkout_for_unknown_email_is_acknowledged() {
    let t = test_app();

    let (status, _) = post_webhook(
        &t.app,
        &checkout_event("evt_1", "ghost@example.com", "payment", Some(PRICE_LIFETIME)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
