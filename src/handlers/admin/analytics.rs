use std::time::Instant;

use axum::extract::State;
use chrono::{Datelike, TimeZone, Utc};
use serde::Serialize;

use crate::catalog::PLUGIN_CATALOG;
use crate::db::{AppState, queries};
use crate::entitlements::SECONDS_PER_DAY;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::{Plan, PlanCounts, PluginDownloadCount, RecentPluginDownload};
use crate::payments::StripeClient;

/// Window for counting an account as currently active.
const ACTIVE_WINDOW_SECS: i64 = 15 * 60;

#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    #[serde(flatten)]
    pub counts: PlanCounts,
    pub active_subscriptions: i64,
    pub active_users: i64,
}

#[derive(Debug, Serialize)]
pub struct PluginAnalyticsResponse {
    pub catalog_size: usize,
    pub total_downloads: i64,
    /// Downloads in the last 7 days
    pub recent_download_count: i64,
    pub downloads_by_plugin: Vec<PluginDownloadCount>,
    pub recent_downloads: Vec<RecentPluginDownload>,
}

#[derive(Debug, Serialize)]
pub struct Transaction {
    pub id: String,
    pub amount_cents: i64,
    pub created: i64,
    pub email: Option<String>,
    pub description: String,
}

/// Amounts are in the smallest currency unit.
#[derive(Debug, Serialize)]
pub struct RevenueResponse {
    /// Successful charges in the last 90 days
    pub total_revenue_cents: i64,
    pub this_month_revenue_cents: i64,
    pub average_transaction_cents: i64,
    pub transaction_count: usize,
    pub recent_transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionSummary {
    pub id: String,
    pub customer: String,
    pub status: Option<String>,
    pub current_period_end: Option<i64>,
    pub amount_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionsResponse {
    pub active_subscriptions: i64,
    pub trial_users: i64,
    pub lifetime_users: i64,
    /// Percentage of the last 30 days' trials that converted
    pub conversion_rate: f64,
    /// Active subscriptions renewing within 7 days
    pub upcoming_renewals: usize,
    pub subscriptions: Vec<SubscriptionSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
    Unconfigured,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WebhookHealth {
    pub configured: bool,
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub timestamp: i64,
    pub database: ServiceHealth,
    pub stripe: ServiceHealth,
    pub webhook: WebhookHealth,
    /// "healthy" when every configured service answered, otherwise "degraded"
    pub overall: &'static str,
}

fn require_stripe(state: &AppState) -> Result<&StripeClient> {
    state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::UpstreamUnavailable("Stripe is not configured".into()))
}

/// GET /admin/stats - Account counts by plan and 7-day registrations
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<AdminStatsResponse>> {
    let conn = state.db.get()?;
    let now = Utc::now().timestamp();

    Ok(Json(AdminStatsResponse {
        counts: queries::plan_counts(&conn, now - 7 * SECONDS_PER_DAY)?,
        active_subscriptions: queries::count_active_subscriptions(&conn)?,
        active_users: queries::count_active_accounts(&conn, now - ACTIVE_WINDOW_SECS)?,
    }))
}

/// GET /admin/plugins - Plugin download analytics
pub async fn get_plugin_analytics(
    State(state): State<AppState>,
) -> Result<Json<PluginAnalyticsResponse>> {
    let conn = state.db.get()?;
    let week_ago = Utc::now().timestamp() - 7 * SECONDS_PER_DAY;

    Ok(Json(PluginAnalyticsResponse {
        catalog_size: PLUGIN_CATALOG.len(),
        total_downloads: queries::count_plugin_downloads(&conn, None)?,
        recent_download_count: queries::count_plugin_downloads(&conn, Some(week_ago))?,
        downloads_by_plugin: queries::plugin_download_counts(&conn)?,
        recent_downloads: queries::recent_plugin_downloads(&conn)?,
    }))
}

/// GET /admin/revenue - Stripe charges over the last 90 days
pub async fn get_revenue(State(state): State<AppState>) -> Result<Json<RevenueResponse>> {
    let stripe = require_stripe(&state)?;
    let now = Utc::now();

    let charges = stripe.list_charges(now.timestamp() - 90 * SECONDS_PER_DAY).await?;
    let succeeded: Vec<_> = charges.into_iter().filter(|c| c.status == "succeeded").collect();

    let month_start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .map(|d| d.timestamp())
        .unwrap_or(0);

    let total: i64 = succeeded.iter().map(|c| c.amount).sum();
    let this_month: i64 = succeeded
        .iter()
        .filter(|c| c.created >= month_start)
        .map(|c| c.amount)
        .sum();
    let average = match succeeded.len() {
        0 => 0,
        n => total / n as i64,
    };

    let recent_transactions = succeeded
        .iter()
        .take(10)
        .map(|c| Transaction {
            id: c.id.clone(),
            amount_cents: c.amount,
            created: c.created,
            email: c.billing_details.as_ref().and_then(|b| b.email.clone()),
            description: c.description.clone().unwrap_or_else(|| "Payment".into()),
        })
        .collect();

    Ok(Json(RevenueResponse {
        total_revenue_cents: total,
        this_month_revenue_cents: this_month,
        average_transaction_cents: average,
        transaction_count: succeeded.len(),
        recent_transactions,
    }))
}

/// GET /admin/subscriptions - Subscription health and trial conversion
pub async fn get_subscriptions(State(state): State<AppState>) -> Result<Json<SubscriptionsResponse>> {
    let stripe = require_stripe(&state)?;
    let subscriptions = stripe.list_active_subscriptions().await?;

    let now = Utc::now().timestamp();
    let month_ago = now - 30 * SECONDS_PER_DAY;
    let next_week = now + 7 * SECONDS_PER_DAY;

    let conn = state.db.get()?;
    let recent_trials = queries::count_recent_trials(&conn, month_ago)?;
    let recent_conversions = queries::count_recent_conversions(&conn, month_ago)?;
    let conversion_rate = if recent_trials > 0 {
        (recent_conversions as f64 / recent_trials as f64 * 1000.0).round() / 10.0
    } else {
        0.0
    };

    let upcoming_renewals = subscriptions
        .iter()
        .filter(|s| s.current_period_end.is_some_and(|end| end <= next_week))
        .count();

    Ok(Json(SubscriptionsResponse {
        active_subscriptions: queries::count_active_subscriptions(&conn)?,
        trial_users: queries::count_accounts_by_plan(&conn, Plan::Trial)?,
        lifetime_users: queries::count_accounts_by_plan(&conn, Plan::Lifetime)?,
        conversion_rate,
        upcoming_renewals,
        subscriptions: subscriptions
            .iter()
            .take(20)
            .map(|s| SubscriptionSummary {
                id: s.id.clone(),
                customer: s.customer.clone(),
                status: s.status.clone(),
                current_period_end: s.current_period_end,
                amount_cents: s.price().and_then(|p| p.unit_amount).unwrap_or(0),
            })
            .collect(),
    }))
}

/// GET /admin/health - Database and Stripe reachability
pub async fn get_health(State(state): State<AppState>) -> Json<HealthReport> {
    let started = Instant::now();
    let database = match state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| queries::ping(&conn))
    {
        Ok(()) => ServiceHealth {
            status: ServiceStatus::Healthy,
            response_time_ms: Some(started.elapsed().as_millis()),
            error: None,
        },
        Err(e) => ServiceHealth {
            status: ServiceStatus::Unhealthy,
            response_time_ms: None,
            error: Some(e.to_string()),
        },
    };

    let stripe = match &state.stripe {
        Some(client) => {
            let started = Instant::now();
            match client.retrieve_balance().await {
                Ok(()) => ServiceHealth {
                    status: ServiceStatus::Healthy,
                    response_time_ms: Some(started.elapsed().as_millis()),
                    error: None,
                },
                Err(e) => ServiceHealth {
                    status: ServiceStatus::Unhealthy,
                    response_time_ms: None,
                    error: Some(e.to_string()),
                },
            }
        }
        None => ServiceHealth {
            status: ServiceStatus::Unconfigured,
            response_time_ms: None,
            error: None,
        },
    };

    let healthy = matches!(database.status, ServiceStatus::Healthy)
        && matches!(stripe.status, ServiceStatus::Healthy);

    Json(HealthReport {
        timestamp: Utc::now().timestamp(),
        database,
        stripe,
        webhook: WebhookHealth {
            configured: state.stripe_webhook_secret.is_some(),
            endpoint: format!("{}/webhook/stripe", state.base_url),
        },
        overall: if healthy { "healthy" } else { "degraded" },
    })
}
