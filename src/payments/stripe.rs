use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::entitlements::CheckoutMode;
use crate::error::{AppError, Result};

use super::CheckoutSession;

type HmacSha256 = Hmac<Sha256>;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Maximum age of a signed webhook payload.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Days of provider-side trial on new subscriptions.
pub const SUBSCRIPTION_TRIAL_DAYS: u32 = 14;

/// Parameters for a hosted Checkout Session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest<'a> {
    pub price_id: &'a str,
    pub mode: CheckoutMode,
    pub customer_email: Option<&'a str>,
    pub success_url: String,
    pub cancel_url: String,
    /// Recorded on the session for reconciliation
    pub plan: &'a str,
    pub billing: &'a str,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
}

impl StripeClient {
    pub fn new(secret_key: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            secret_key: secret_key.to_string(),
        }
    }

    pub async fn create_checkout_session(&self, request: &CheckoutRequest<'_>) -> Result<CheckoutSession> {
        let mut form: Vec<(&str, String)> = vec![
            ("payment_method_types[0]", "card".into()),
            ("line_items[0][price]", request.price_id.to_string()),
            ("line_items[0][quantity]", "1".into()),
            ("success_url", request.success_url.clone()),
            ("cancel_url", request.cancel_url.clone()),
            ("metadata[plan]", request.plan.to_string()),
            ("metadata[billing]", request.billing.to_string()),
        ];
        match request.mode {
            CheckoutMode::OneTime => form.push(("mode", "payment".into())),
            CheckoutMode::Subscription => {
                form.push(("mode", "subscription".into()));
                form.push((
                    "subscription_data[trial_period_days]",
                    SUBSCRIPTION_TRIAL_DAYS.to_string(),
                ));
                form.push(("allow_promotion_codes", "true".into()));
                form.push(("billing_address_collection", "auto".into()));
            }
        }
        if let Some(email) = request.customer_email {
            form.push(("customer_email", email.to_string()));
        }

        let response = self
            .client
            .post(format!("{}/checkout/sessions", STRIPE_API_BASE))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let session: StripeCreatedSession = parse_response(response, "create checkout session").await?;
        let url = session
            .url
            .ok_or_else(|| AppError::UpstreamUnavailable("Stripe returned no checkout URL".into()))?;

        Ok(CheckoutSession { id: session.id, url })
    }

    /// Price of the first line item of a completed Checkout Session.
    pub async fn fetch_checkout_price_id(&self, session_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!(
                "{}/checkout/sessions/{}/line_items",
                STRIPE_API_BASE,
                urlencoding::encode(session_id)
            ))
            .bearer_auth(&self.secret_key)
            .query(&[("limit", "1")])
            .send()
            .await?;

        let items: StripeList<StripeLineItem> = parse_response(response, "list line items").await?;
        Ok(items
            .data
            .into_iter()
            .next()
            .and_then(|item| item.price)
            .map(|price| price.id))
    }

    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!(
                "{}/subscriptions/{}",
                STRIPE_API_BASE,
                urlencoding::encode(subscription_id)
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let _: StripeSubscription = parse_response(response, "cancel subscription").await?;
        Ok(())
    }

    /// Up to 100 charges created at or after `since`.
    pub async fn list_charges(&self, since: i64) -> Result<Vec<StripeCharge>> {
        let response = self
            .client
            .get(format!("{}/charges", STRIPE_API_BASE))
            .bearer_auth(&self.secret_key)
            .query(&[("limit", "100".to_string()), ("created[gte]", since.to_string())])
            .send()
            .await?;

        let charges: StripeList<StripeCharge> = parse_response(response, "list charges").await?;
        Ok(charges.data)
    }

    pub async fn list_active_subscriptions(&self) -> Result<Vec<StripeSubscription>> {
        let response = self
            .client
            .get(format!("{}/subscriptions", STRIPE_API_BASE))
            .bearer_auth(&self.secret_key)
            .query(&[("limit", "50"), ("status", "active")])
            .send()
            .await?;

        let subscriptions: StripeList<StripeSubscription> =
            parse_response(response, "list subscriptions").await?;
        Ok(subscriptions.data)
    }

    /// Cheapest authenticated call; used as a reachability probe.
    pub async fn retrieve_balance(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/balance", STRIPE_API_BASE))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        let _: serde_json::Value = parse_response(response, "retrieve balance").await?;
        Ok(())
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "Stripe {} failed", action);
        return Err(AppError::UpstreamUnavailable(format!(
            "Stripe {} failed: {}",
            action, status
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::UpstreamUnavailable(format!("Failed to parse Stripe response: {}", e)))
}

/// Verify a `stripe-signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// the raw payload.
///
/// Returns `Ok(false)` for a wrong or stale signature and `Err(BadRequest)`
/// when the header cannot be parsed.
pub fn verify_webhook_signature(secret: &str, payload: &[u8], header: &str, now: i64) -> Result<bool> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => {
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| AppError::BadRequest("Signature header has no timestamp".into()))?;
    if signatures.is_empty() {
        return Err(AppError::BadRequest("Signature header has no v1 signature".into()));
    }

    if now.abs_diff(timestamp) > WEBHOOK_TOLERANCE_SECS.unsigned_abs() {
        tracing::warn!(timestamp, now, "Stripe webhook timestamp outside tolerance");
        return Ok(false);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Invalid webhook secret".into()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = mac.finalize().into_bytes();

    Ok(signatures
        .iter()
        .any(|sig| bool::from(sig.as_slice().ct_eq(expected.as_slice()))))
}

#[derive(Debug, Deserialize)]
struct StripeCreatedSession {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub mode: String,
    pub customer: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<StripeCustomerDetails>,
    pub subscription: Option<String>,
    pub line_items: Option<StripeList<StripeLineItem>>,
}

impl StripeCheckoutSession {
    pub fn email(&self) -> Option<&str> {
        self.customer_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref()?.email.as_deref())
            .filter(|e| !e.trim().is_empty())
    }

    /// Price id when the payload carries expanded line items.
    pub fn embedded_price_id(&self) -> Option<&str> {
        self.line_items
            .as_ref()?
            .data
            .first()?
            .price
            .as_ref()
            .map(|p| p.id.as_str())
    }

    pub fn checkout_mode(&self) -> CheckoutMode {
        match self.mode.as_str() {
            "payment" => CheckoutMode::OneTime,
            _ => CheckoutMode::Subscription,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeLineItem {
    pub price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub id: String,
    pub unit_amount: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: Option<String>,
    pub current_period_end: Option<i64>,
    pub items: Option<StripeList<StripeSubscriptionItem>>,
}

impl StripeSubscription {
    pub fn price(&self) -> Option<&StripePrice> {
        self.items.as_ref()?.data.first().map(|item| &item.price)
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: StripePrice,
}

#[derive(Debug, Deserialize)]
pub struct StripeCharge {
    pub id: String,
    /// Smallest currency unit
    pub amount: i64,
    pub status: String,
    pub created: i64,
    pub description: Option<String>,
    pub billing_details: Option<StripeCustomerDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{}.", timestamp).as_bytes());
        mac.update(payload);
        format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign("whsec_test", 1000, payload);
        assert!(verify_webhook_signature("whsec_test", payload, &header, 1010).unwrap());
    }

    #[test]
    fn test_any_v1_may_match() {
        let payload = b"{}";
        let good = sign("whsec_test", 1000, payload);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t=1000,v1={},v1={}", "00".repeat(32), good_sig);
        assert!(verify_webhook_signature("whsec_test", payload, &header, 1000).unwrap());
    }

    #[test]
    fn test_tampered_payload_or_wrong_secret() {
        let header = sign("whsec_test", 1000, b"original");
        assert!(!verify_webhook_signature("whsec_test", b"tampered", &header, 1000).unwrap());
        assert!(!verify_webhook_signature("whsec_other", b"original", &header, 1000).unwrap());
    }

    #[test]
    fn test_stale_signature() {
        let header = sign("whsec_test", 1000, b"{}");
        assert!(!verify_webhook_signature("whsec_test", b"{}", &header, 1000 + 301).unwrap());
        assert!(verify_webhook_signature("whsec_test", b"{}", &header, 1000 + 300).unwrap());
    }

    #[test]
    fn test_extreme_timestamps_are_stale_not_fatal() {
        for timestamp in [i64::MIN, i64::MAX] {
            let header = format!("t={},v1={}", timestamp, "00".repeat(32));
            assert!(!verify_webhook_signature("whsec_test", b"{}", &header, 1_700_000_000).unwrap());
        }
        let header = format!("t=1000,v1={}", "00".repeat(32));
        assert!(!verify_webhook_signature("whsec_test", b"{}", &header, i64::MIN).unwrap());
    }

    #[test]
    fn test_malformed_header() {
        assert!(matches!(
            verify_webhook_signature("whsec_test", b"{}", "v1=abcd", 1000),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            verify_webhook_signature("whsec_test", b"{}", "t=1000", 1000),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_checkout_session_fields() {
        let session: StripeCheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "mode": "payment",
            "customer": "cus_1",
            "customer_email": null,
            "customer_details": { "email": "buyer@example.com" },
            "subscription": null,
            "line_items": { "data": [ { "price": { "id": "price_life", "unit_amount": 14900 } } ] }
        }))
        .unwrap();

        assert_eq!(session.email(), Some("buyer@example.com"));
        assert_eq!(session.embedded_price_id(), Some("price_life"));
        assert_eq!(session.checkout_mode(), CheckoutMode::OneTime);
    }
}
