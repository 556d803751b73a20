use axum::{Extension, extract::State};
use chrono::Utc;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::jwt::Identity;

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub success: bool,
    pub last_active_at: i64,
}

/// POST /heartbeat - Mark the caller as active now
pub async fn heartbeat(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<HeartbeatResponse>> {
    let conn = state.db.get()?;
    let now = Utc::now().timestamp();

    if !queries::touch_last_active(&conn, &identity.account_id, now)? {
        return Err(AppError::NotFound("User not found".into()));
    }

    Ok(Json(HeartbeatResponse {
        success: true,
        last_active_at: now,
    }))
}
