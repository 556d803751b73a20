use axum::{Extension, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::entitlements::{Entitlement, PlanFeatures, evaluate};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::jwt::Identity;

#[derive(Debug, Serialize)]
pub struct TimeLeft {
    pub days: i64,
    pub hours: i64,
}

#[derive(Debug, Serialize)]
pub struct LicenseResponse {
    pub valid: bool,
    pub plan: String,
    pub trial_expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<TimeLeft>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<PlanFeatures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upgrade_url: Option<String>,
}

/// POST /license/validate - Entitlement check for the desktop client
///
/// Denials are answered with 403 and the same body shape as a valid license,
/// so clients can render the reason.
pub async fn validate_license(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<(StatusCode, Json<LicenseResponse>)> {
    let conn = state.db.get()?;
    let account = queries::get_account_by_id(&conn, &identity.account_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let upgrade_url = format!("{}/pricing", state.base_url);

    let (status, body) = match evaluate(&account, Utc::now().timestamp()) {
        Entitlement::Valid {
            plan,
            features,
            trial: Some(trial),
        } => (
            StatusCode::OK,
            LicenseResponse {
                valid: true,
                plan: plan.to_string(),
                trial_expired: false,
                expires_at: Some(trial.expires_at),
                time_left: Some(TimeLeft {
                    days: trial.days_left,
                    hours: trial.hours_left,
                }),
                message: trial.message,
                features: Some(features),
                upgrade_url: None,
            },
        ),
        Entitlement::Valid {
            plan,
            features,
            trial: None,
        } => (
            StatusCode::OK,
            LicenseResponse {
                valid: true,
                plan: plan.to_string(),
                trial_expired: false,
                expires_at: None,
                time_left: None,
                message: format!("Your {} plan is active.", plan.as_ref().to_uppercase()),
                features: Some(features),
                upgrade_url: None,
            },
        ),
        Entitlement::TrialExpired { expires_at } => (
            StatusCode::FORBIDDEN,
            LicenseResponse {
                valid: false,
                plan: account.plan_name.clone(),
                trial_expired: true,
                expires_at,
                time_left: None,
                message: "Your free trial has expired. Upgrade to continue using JARVIS Omega."
                    .into(),
                features: None,
                upgrade_url: Some(upgrade_url),
            },
        ),
        Entitlement::Invalid { reason } => (
            StatusCode::FORBIDDEN,
            LicenseResponse {
                valid: false,
                plan: reason.to_string(),
                trial_expired: false,
                expires_at: None,
                time_left: None,
                message: "Invalid account plan. Please contact support.".into(),
                features: None,
                upgrade_url: Some(upgrade_url),
            },
        ),
    };

    Ok((status, Json(body)))
}
