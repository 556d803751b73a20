use std::str::FromStr;

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::db::AppState;
use crate::entitlements::{BillingInterval, CheckoutMode, is_placeholder};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::Plan;
use crate::payments::CheckoutRequest;
use crate::util::{is_valid_email, normalize_email};

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub plan: String,
    /// "monthly" or "yearly"; ignored for lifetime
    #[serde(default)]
    pub billing: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,
    pub url: String,
}

/// POST /checkout - Start a hosted Stripe Checkout Session
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(input): Json<CheckoutBody>,
) -> Result<Json<CheckoutResponse>> {
    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::UpstreamUnavailable("Stripe is not configured".into()))?;

    let plan = Plan::from_str(input.plan.trim())
        .ok()
        .filter(|p| p.is_paid())
        .ok_or_else(|| AppError::BadRequest(format!("Unknown plan: {}", input.plan)))?;

    let interval = match plan {
        Plan::Lifetime => BillingInterval::OneTime,
        _ => {
            let billing = input.billing.as_deref().unwrap_or("monthly").trim();
            BillingInterval::from_str(billing)
                .ok()
                .filter(|i| *i != BillingInterval::OneTime)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown billing interval: {}", billing)))?
        }
    };

    let price_id = state
        .prices
        .price_for(plan, interval)
        .map(|entry| entry.price_id.clone())
        .ok_or_else(|| {
            AppError::BadRequest(format!("Price ID not configured for {} {}", plan, interval))
        })?;
    if is_placeholder(&price_id) {
        tracing::error!(price_id = %price_id, "Checkout price is a placeholder");
        return Err(AppError::BadRequest("Invalid price configuration".into()));
    }

    let email = input
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| is_valid_email(e));

    let mode = match interval {
        BillingInterval::OneTime => CheckoutMode::OneTime,
        _ => CheckoutMode::Subscription,
    };
    let plan_name = plan.to_string();
    let billing_name = interval.to_string();

    let session = stripe
        .create_checkout_session(&CheckoutRequest {
            price_id: &price_id,
            mode,
            customer_email: email.as_deref(),
            success_url: format!(
                "{}/success.html?session_id={{CHECKOUT_SESSION_ID}}",
                state.base_url
            ),
            cancel_url: format!("{}/pricing.html", state.base_url),
            plan: &plan_name,
            billing: &billing_name,
        })
        .await?;

    tracing::info!(session_id = %session.id, plan = %plan, billing = %interval, "Checkout session created");

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}
