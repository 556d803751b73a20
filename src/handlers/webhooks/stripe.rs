use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;

use crate::db::{AppState, queries};
use crate::entitlements::{BillingEvent, BillingOutcome, Resolution, resolve};
use crate::payments::{
    StripeCheckoutSession, StripeSubscription, StripeWebhookEvent, verify_webhook_signature,
};

const PROVIDER: &str = "stripe";

type WebhookReply = (StatusCode, &'static str);

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let Some(secret) = state.stripe_webhook_secret.as_deref() else {
        tracing::error!("Stripe webhook received but STRIPE_WEBHOOK_SECRET is not set");
        return (StatusCode::SERVICE_UNAVAILABLE, "Webhook not configured");
    };

    let signature = match headers.get("stripe-signature") {
        Some(sig) => match sig.to_str() {
            Ok(s) => s,
            Err(_) => return (StatusCode::BAD_REQUEST, "Invalid signature header"),
        },
        None => return (StatusCode::BAD_REQUEST, "Missing stripe-signature header"),
    };

    match verify_webhook_signature(secret, &body, signature, Utc::now().timestamp()) {
        Ok(true) => {}
        Ok(false) => return (StatusCode::BAD_REQUEST, "Invalid signature"),
        Err(e) => {
            tracing::warn!("Malformed Stripe signature header: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid signature header");
        }
    }

    let event: StripeWebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to parse Stripe webhook: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    match with_conn(&state, |conn| queries::webhook_event_recorded(conn, PROVIDER, &event.id)) {
        Ok(true) => return (StatusCode::OK, "Already processed"),
        Ok(false) => {}
        Err(reply) => return reply,
    }

    let billing_event = match normalize_event(&state, &event).await {
        Ok(Some(e)) => e,
        Ok(None) => return (StatusCode::OK, "Event ignored"),
        Err(reply) => return reply,
    };

    if let Err(reply) = apply_billing_event(&state, &event.id, &billing_event) {
        return reply;
    }

    if let Err(reply) = with_conn(&state, |conn| {
        queries::try_record_webhook_event(conn, PROVIDER, &event.id)
    }) {
        return reply;
    }

    (StatusCode::OK, "OK")
}

/// Run a storage call, mapping failures to a retryable reply.
fn with_conn<T>(
    state: &AppState,
    f: impl FnOnce(&rusqlite::Connection) -> crate::error::Result<T>,
) -> Result<T, WebhookReply> {
    let conn = state.db.get().map_err(|e| {
        tracing::error!("DB connection error: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
    })?;
    f(&*conn).map_err(|e| {
        tracing::error!("DB error: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
    })
}

/// Turn a Stripe event into a `BillingEvent`. `Ok(None)` for event types
/// and payloads that carry nothing to apply.
async fn normalize_event(
    state: &AppState,
    event: &StripeWebhookEvent,
) -> Result<Option<BillingEvent>, WebhookReply> {
    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: StripeCheckoutSession =
                match serde_json::from_value(event.data.object.clone()) {
                    Ok(s) => s,
                    Err(e) => {
                        tracing::error!("Failed to parse checkout session: {}", e);
                        return Err((StatusCode::BAD_REQUEST, "Invalid checkout session"));
                    }
                };

            let Some(email) = session.email().map(str::to_string) else {
                tracing::error!(session_id = %session.id, "No customer email in checkout session");
                return Ok(None);
            };

            let price_id = match session.embedded_price_id() {
                Some(price_id) => price_id.to_string(),
                None => match fetch_price_id(state, &session.id).await? {
                    Some(price_id) => price_id,
                    None => {
                        tracing::warn!(session_id = %session.id, "Checkout session has no price");
                        return Ok(None);
                    }
                },
            };

            Ok(Some(BillingEvent::CheckoutCompleted {
                customer_email: email,
                customer_id: session.customer.clone(),
                price_id,
                mode: session.checkout_mode(),
                subscription_id: session.subscription.clone(),
            }))
        }
        "customer.subscription.updated" => {
            let subscription = parse_subscription(event)?;
            let Some(price) = subscription.price() else {
                tracing::warn!(subscription_id = %subscription.id, "Subscription has no price");
                return Ok(None);
            };
            Ok(Some(BillingEvent::SubscriptionUpdated {
                customer_id: subscription.customer.clone(),
                price_id: price.id.clone(),
                subscription_id: subscription.id.clone(),
            }))
        }
        "customer.subscription.deleted" => {
            let subscription = parse_subscription(event)?;
            Ok(Some(BillingEvent::SubscriptionCancelled {
                customer_id: subscription.customer,
            }))
        }
        other => {
            tracing::debug!(event_type = other, "Ignoring Stripe event");
            Ok(None)
        }
    }
}

fn parse_subscription(event: &StripeWebhookEvent) -> Result<StripeSubscription, WebhookReply> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        tracing::error!("Failed to parse subscription: {}", e);
        (StatusCode::BAD_REQUEST, "Invalid subscription")
    })
}

/// Line-item price for a checkout payload that did not embed it. A failed
/// lookup is answered with 503 so Stripe redelivers.
async fn fetch_price_id(state: &AppState, session_id: &str) -> Result<Option<String>, WebhookReply> {
    let Some(stripe) = &state.stripe else {
        tracing::error!("Cannot look up checkout price: STRIPE_SECRET_KEY is not set");
        return Err((StatusCode::SERVICE_UNAVAILABLE, "Price lookup unavailable"));
    };
    stripe.fetch_checkout_price_id(session_id).await.map_err(|e| {
        tracing::error!(session_id, "Checkout price lookup failed: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, "Price lookup failed")
    })
}

fn apply_billing_event(
    state: &AppState,
    event_id: &str,
    event: &BillingEvent,
) -> Result<(), WebhookReply> {
    let (selector, change) = match resolve(event, &state.prices) {
        Resolution::Apply { selector, change } => (selector, change),
        Resolution::Ignore(reason) => {
            tracing::info!(event_id, kind = event.kind(), "Billing event ignored: {}", reason);
            return Ok(());
        }
    };

    let mut conn = state.db.get().map_err(|e| {
        tracing::error!("DB connection error: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable")
    })?;

    match queries::apply_plan_change(&mut conn, &selector, &change, Utc::now().timestamp()) {
        Ok(BillingOutcome::Applied(update)) => {
            tracing::info!(
                event_id,
                kind = event.kind(),
                plan = %update.plan,
                max_devices = update.max_devices,
                "Plan updated from billing event"
            );
        }
        Ok(BillingOutcome::Unchanged) => {
            tracing::info!(event_id, kind = event.kind(), "Billing event already applied");
        }
        Ok(BillingOutcome::AccountNotFound) => {
            tracing::warn!(event_id, kind = event.kind(), ?selector, "No account for billing event");
        }
        Err(e) => {
            tracing::error!(event_id, "Failed to apply billing event: {}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "Failed to apply event"));
        }
    }

    Ok(())
}
