//! Shared fixtures for integration tests.
//!
//! Each test gets its own SQLite file in a temp directory so every pooled
//! connection sees the same database.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tempfile::TempDir;
use tower::ServiceExt;

pub use omega::db::{AppState, queries};
pub use omega::models::{Account, CreateAccount, Plan};

use omega::email::EmailService;
use omega::entitlements::{AccountSelector, BillingInterval, PlanChange, PriceEntry, PriceTable};
use omega::jwt::{SessionClaims, SessionSigner};

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const ADMIN_EMAIL: &str = "boss@example.com";

pub const PRICE_PRO_MONTHLY: &str = "price_pro_monthly";
pub const PRICE_PRO_YEARLY: &str = "price_pro_yearly";
pub const PRICE_BUSINESS_MONTHLY: &str = "price_business_monthly";
pub const PRICE_BUSINESS_YEARLY: &str = "price_business_yearly";
pub const PRICE_LIFETIME: &str = "price_lifetime";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _dir: TempDir,
}

pub fn test_price_table() -> PriceTable {
    let entry = |price_id: &str, plan, interval| PriceEntry {
        price_id: price_id.to_string(),
        plan,
        interval,
    };
    PriceTable::new(vec![
        entry(PRICE_PRO_MONTHLY, Plan::Pro, BillingInterval::Monthly),
        entry(PRICE_PRO_YEARLY, Plan::Pro, BillingInterval::Yearly),
        entry(PRICE_BUSINESS_MONTHLY, Plan::Business, BillingInterval::Monthly),
        entry(PRICE_BUSINESS_YEARLY, Plan::Business, BillingInterval::Yearly),
        entry(PRICE_LIFETIME, Plan::Lifetime, BillingInterval::OneTime),
    ])
}

/// Full router over a fresh database. Stripe is not configured.
pub fn test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("omega-test.db");
    let pool = omega::db::create_pool(path.to_str().unwrap(), 5000).unwrap();
    {
        let conn = pool.get().unwrap();
        omega::db::init_db(&conn).unwrap();
    }

    let state = AppState {
        db: pool,
        base_url: "http://localhost:3000".to_string(),
        prices: Arc::new(test_price_table()),
        sessions: SessionSigner::new(TEST_JWT_SECRET),
        admin_emails: Arc::new(vec![ADMIN_EMAIL.to_string()]),
        stripe: None,
        stripe_webhook_secret: Some(TEST_WEBHOOK_SECRET.to_string()),
        email: EmailService::disabled(),
    };

    TestApp {
        app: omega::handlers::router(state.clone()),
        state,
        _dir: dir,
    }
}

/// Insert a trial account directly. The password hash is a placeholder, so
/// these accounts cannot log in.
pub fn create_account(state: &AppState, email: &str) -> Account {
    let conn = state.db.get().unwrap();
    queries::create_account(
        &conn,
        &CreateAccount {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
        },
    )
    .unwrap()
}

/// Move an account to `plan` the way an admin override does.
pub fn set_plan(state: &AppState, account: &Account, plan: Plan) {
    let mut conn = state.db.get().unwrap();
    queries::apply_plan_change(
        &mut conn,
        &AccountSelector::Email(account.email.clone()),
        &PlanChange::Override(plan),
        chrono::Utc::now().timestamp(),
    )
    .unwrap();
}

pub fn set_customer(state: &AppState, account: &Account, customer_id: &str, subscription_id: Option<&str>) {
    let conn = state.db.get().unwrap();
    conn.execute(
        "UPDATE accounts SET stripe_customer_id = ?1, subscription_id = ?2 WHERE id = ?3",
        rusqlite::params![customer_id, subscription_id, &account.id],
    )
    .unwrap();
}

pub fn set_trial_expiry(state: &AppState, account: &Account, expires_at: i64) {
    let conn = state.db.get().unwrap();
    conn.execute(
        "UPDATE accounts SET trial_expires_at = ?1 WHERE id = ?2",
        rusqlite::params![expires_at, &account.id],
    )
    .unwrap();
}

pub fn reload(state: &AppState, account: &Account) -> Account {
    let conn = state.db.get().unwrap();
    queries::get_account_by_id(&conn, &account.id).unwrap().unwrap()
}

pub fn token_for(state: &AppState, account: &Account) -> String {
    state
        .sessions
        .issue(SessionClaims {
            account_id: account.id.clone(),
            email: account.email.clone(),
            is_admin: account.is_admin,
        })
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("user-agent", "omega-desktop/1.0")
        .header("x-forwarded-for", "203.0.113.10");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Send one request and decode the JSON body (`Value::Null` when the body is
/// not JSON).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

/// `stripe-signature` header value for `payload` signed at `timestamp`.
pub fn stripe_signature(secret: &str, timestamp: i64, payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

pub fn webhook_request(payload: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/webhook/stripe")
        .header("content-type", "application/json")
        .header("stripe-signature", signature)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

/// Sign `payload` with the test secret at the current time and post it.
pub async fn post_webhook(app: &Router, payload: &Value) -> (StatusCode, Value) {
    let payload = payload.to_string();
    let signature = stripe_signature(TEST_WEBHOOK_SECRET, chrono::Utc::now().timestamp(), &payload);
    send(app, webhook_request(&payload, &signature)).await
}
