use std::str::FromStr;

use axum::extract::{Extension, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::entitlements::{AccountSelector, BillingOutcome, PlanChange};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Path, Query};
use crate::jwt::Identity;
use crate::models::{Account, Plan, UserNote};

/// Shortest search string accepted by the user search.
const MIN_SEARCH_CHARS: usize = 2;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<Account>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePlanRequest {
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub success: bool,
    pub message: String,
    pub user: Account,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub note: String,
}

#[derive(Debug, Serialize)]
pub struct NoteListResponse {
    pub notes: Vec<UserNote>,
}

#[derive(Debug, Serialize)]
pub struct NoteResponse {
    pub success: bool,
    pub note: UserNote,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelSubscriptionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// GET /admin/users - All accounts, or an email search with `?query=`
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<UserListQuery>,
) -> Result<Json<UserListResponse>> {
    let conn = state.db.get()?;

    let users = match query.query.as_deref().map(str::trim) {
        Some(q) if q.chars().count() >= MIN_SEARCH_CHARS => queries::search_accounts(&conn, q)?,
        Some(q) if !q.is_empty() => {
            return Err(AppError::BadRequest(format!(
                "Search query must be at least {} characters",
                MIN_SEARCH_CHARS
            )));
        }
        _ => queries::list_accounts(&conn)?,
    };

    Ok(Json(UserListResponse {
        total: users.len(),
        users,
    }))
}

/// DELETE /admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<Json<DeleteUserResponse>> {
    if id == admin.account_id {
        return Err(AppError::BadRequest("Cannot delete your own account".into()));
    }

    let conn = state.db.get()?;
    if !queries::delete_account(&conn, &id)? {
        return Err(AppError::NotFound("User not found".into()));
    }

    tracing::info!(admin = %admin.email, account_id = %id, "ADMIN: Deleted account");

    Ok(Json(DeleteUserResponse {
        success: true,
        message: "User deleted successfully".into(),
    }))
}

/// PUT /admin/users/{id}/plan - Override an account's plan
///
/// Device quota follows the plan table. Trial gets a fresh window; any other
/// plan clears the trial expiry.
pub async fn update_user_plan(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    Json(input): Json<UpdatePlanRequest>,
) -> Result<Json<AccountResponse>> {
    let plan = Plan::from_str(input.plan.trim())
        .map_err(|_| AppError::BadRequest("Invalid plan type".into()))?;

    let mut conn = state.db.get()?;
    let account = queries::get_account_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let outcome = queries::apply_plan_change(
        &mut conn,
        &AccountSelector::Email(account.email.clone()),
        &PlanChange::Override(plan),
        Utc::now().timestamp(),
    )?;
    if outcome == BillingOutcome::AccountNotFound {
        return Err(AppError::NotFound("User not found".into()));
    }

    tracing::info!(admin = %admin.email, account_id = %id, plan = %plan, "ADMIN: Plan override");

    let user = queries::get_account_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(AccountResponse {
        success: true,
        message: format!("Plan updated to {}", plan),
        user,
    }))
}

/// GET /admin/users/{id}/notes
pub async fn list_user_notes(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NoteListResponse>> {
    let conn = state.db.get()?;
    queries::get_account_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(NoteListResponse {
        notes: queries::list_user_notes(&conn, &id)?,
    }))
}

/// POST /admin/users/{id}/notes
pub async fn create_user_note(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    Json(input): Json<CreateNoteRequest>,
) -> Result<Json<NoteResponse>> {
    let note = input.note.trim();
    if note.is_empty() {
        return Err(AppError::BadRequest("Note is required".into()));
    }

    let conn = state.db.get()?;
    queries::get_account_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let note = queries::create_user_note(&conn, &id, note, &admin.email)?;

    Ok(Json(NoteResponse {
        success: true,
        note,
    }))
}

/// POST /admin/users/{id}/cancel-subscription
///
/// Cancels at Stripe first; the account is only downgraded once Stripe
/// confirms. The downgrade is the same transition a cancellation webhook
/// applies, so the later webhook converges on the same state.
pub async fn cancel_user_subscription(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    Json(input): Json<CancelSubscriptionRequest>,
) -> Result<Json<AccountResponse>> {
    let account = {
        let conn = state.db.get()?;
        queries::get_account_by_id(&conn, &id)?
            .ok_or_else(|| AppError::NotFound("User or subscription not found".into()))?
    };
    let subscription_id = account
        .subscription_id
        .clone()
        .ok_or_else(|| AppError::NotFound("User or subscription not found".into()))?;

    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::UpstreamUnavailable("Stripe is not configured".into()))?;
    stripe.cancel_subscription(&subscription_id).await?;

    let reason = input
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("Cancelled by admin");

    let mut conn = state.db.get()?;
    queries::apply_plan_change(
        &mut conn,
        &AccountSelector::Email(account.email.clone()),
        &PlanChange::Revoke,
        Utc::now().timestamp(),
    )?;
    queries::record_cancellation(&conn, &id, reason)?;

    tracing::info!(
        admin = %admin.email,
        account_id = %id,
        subscription_id = %subscription_id,
        "ADMIN: Cancelled subscription"
    );

    let user = queries::get_account_by_id(&conn, &id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(AccountResponse {
        success: true,
        message: "Subscription cancelled successfully".into(),
        user,
    }))
}
