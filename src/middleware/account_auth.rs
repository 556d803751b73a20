use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::jwt::Identity;
use crate::util::extract_bearer_token;

/// Verify the bearer session token.
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Identity> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| AppError::Unauthorized("No token provided".into()))?;
    state.sessions.verify(token)
}

/// Require a valid session; inserts the caller's `Identity` into request extensions.
pub async fn account_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let identity = authenticate(&state, request.headers())?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Require a valid session belonging to an admin.
///
/// Admin status is re-read from storage on every request: the account flag or
/// membership in `ADMIN_EMAILS`. The flag baked into the token is not trusted.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let identity = authenticate(&state, request.headers())?;

    let account = {
        let conn = state.db.get()?;
        queries::get_account_by_id(&conn, &identity.account_id)?
            .ok_or_else(|| AppError::Unauthorized("Account no longer exists".into()))?
    };

    if !(account.is_admin || state.is_admin_email(&account.email)) {
        tracing::warn!(account_id = %account.id, "Non-admin attempted admin access");
        return Err(AppError::Forbidden("Admin access required".into()));
    }

    request.extensions_mut().insert(Identity {
        account_id: account.id,
        email: account.email,
        is_admin: true,
    });
    Ok(next.run(request).await)
}
