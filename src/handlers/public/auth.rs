use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::email::{EmailSendResult, RESET_LINK_MINUTES};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::jwt::SessionClaims;
use crate::models::{Account, AccountSummary, CreateAccount};
use crate::password::{check_password_strength, hash_password, verify_password};
use crate::util::{generate_token, hash_token, is_valid_email, normalize_email};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: AccountSummary,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

fn issue_session(state: &AppState, account: &Account, is_admin: bool) -> Result<AuthResponse> {
    let token = state.sessions.issue(SessionClaims {
        account_id: account.id.clone(),
        email: account.email.clone(),
        is_admin,
    })?;
    Ok(AuthResponse {
        success: true,
        token,
        user: AccountSummary::new(account, is_admin),
    })
}

/// POST /auth/register - Create a trial account and sign it in
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let name = input.name.trim();
    let email = normalize_email(&input.email);
    if name.is_empty() || email.is_empty() || input.password.is_empty() {
        return Err(AppError::BadRequest("Name, email and password are required".into()));
    }
    check_password_strength(&input.password)?;
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    let password_hash = hash_password(&input.password)?;
    let conn = state.db.get()?;
    let account = queries::create_account(
        &conn,
        &CreateAccount {
            name: name.to_string(),
            email,
            password_hash,
        },
    )?;

    tracing::info!(account_id = %account.id, "Account registered");

    let is_admin = state.is_admin_email(&account.email);
    let response = issue_session(&state, &account, is_admin)?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /auth/login - Exchange credentials for a session token
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    if input.email.trim().is_empty() || input.password.is_empty() {
        return Err(AppError::BadRequest("Email and password are required".into()));
    }
    let email = normalize_email(&input.email);

    let conn = state.db.get()?;
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let account = queries::get_account_by_email(&conn, &email)?.ok_or_else(invalid)?;
    if !verify_password(&account.password_hash, &input.password) {
        return Err(invalid());
    }

    queries::record_login(&conn, &account.id)?;
    let is_admin = account.is_admin || state.is_admin_email(&account.email);

    Ok(Json(issue_session(&state, &account, is_admin)?))
}

/// POST /auth/forgot-password - Email a reset link
///
/// Answers the same way whether or not the account exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(input): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let email = normalize_email(&input.email);
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }

    let account = {
        let conn = state.db.get()?;
        let account = queries::get_account_by_email(&conn, &email)?;
        if let Some(account) = &account {
            let token = generate_token();
            let expires_at = chrono::Utc::now().timestamp() + RESET_LINK_MINUTES * 60;
            queries::set_password_reset(&conn, &account.id, &hash_token(&token), expires_at)?;
            Some((account.email.clone(), token))
        } else {
            None
        }
    };

    match account {
        Some((email, token)) => {
            let reset_url = format!(
                "{}/reset-password?token={}&email={}",
                state.base_url,
                token,
                urlencoding::encode(&email)
            );
            // Delivery failures are logged only; the reply must not depend on them.
            match state.email.send_password_reset(&email, &reset_url).await {
                Ok(EmailSendResult::Sent) => {}
                Ok(EmailSendResult::NoApiKey) => {
                    tracing::info!("Password reset link (email disabled): {}", reset_url);
                }
                Err(e) => tracing::error!("Password reset email failed: {}", e),
            }
        }
        None => tracing::debug!("Password reset requested for unknown email"),
    }

    Ok(Json(MessageResponse {
        success: true,
        message: "If an account exists with this email, you will receive a password reset link shortly."
            .into(),
    }))
}

/// POST /auth/reset-password - Set a new password with a reset token
pub async fn reset_password(
    State(state): State<AppState>,
    Json(input): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    if input.email.trim().is_empty() || input.token.is_empty() || input.new_password.is_empty() {
        return Err(AppError::BadRequest("Email, token and new password are required".into()));
    }
    check_password_strength(&input.new_password)?;

    let email = normalize_email(&input.email);
    let new_hash = hash_password(&input.new_password)?;

    let conn = state.db.get()?;
    if !queries::reset_password(&conn, &email, &hash_token(input.token.trim()), &new_hash)? {
        return Err(AppError::BadRequest("Invalid or expired reset token".into()));
    }

    tracing::info!("Password reset completed");

    Ok(Json(MessageResponse {
        success: true,
        message: "Password has been reset successfully. You can now log in with your new password."
            .into(),
    }))
}
