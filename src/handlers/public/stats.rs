use axum::extract::State;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;

/// Window for counting an account as currently active.
const ACTIVE_WINDOW_SECS: i64 = 15 * 60;

#[derive(Debug, Serialize)]
pub struct DownloadStatsResponse {
    pub total_downloads: i64,
    pub daily_downloads: i64,
    pub weekly_downloads: i64,
    pub active_users: i64,
}

#[derive(Debug, Deserialize)]
pub struct StatsActionRequest {
    pub action: String,
}

/// GET /stats/downloads - Site-wide download counters
pub async fn get_download_stats(State(state): State<AppState>) -> Result<Json<DownloadStatsResponse>> {
    let conn = state.db.get()?;
    let now = Utc::now();

    let stats = queries::get_download_stats(&conn, now.date_naive())?;
    let active_users = queries::count_active_accounts(&conn, now.timestamp() - ACTIVE_WINDOW_SECS)?;

    Ok(Json(DownloadStatsResponse {
        total_downloads: stats.total_downloads,
        daily_downloads: stats.daily_downloads,
        weekly_downloads: stats.weekly_downloads,
        active_users,
    }))
}

/// POST /stats/downloads - `{"action": "increment"}` bumps the counters
pub async fn update_download_stats(
    State(state): State<AppState>,
    Json(input): Json<StatsActionRequest>,
) -> Result<Json<DownloadStatsResponse>> {
    if input.action != "increment" {
        return Err(AppError::BadRequest(format!("Unknown action: {}", input.action)));
    }

    let mut conn = state.db.get()?;
    let now = Utc::now();

    let stats = queries::increment_downloads(&mut conn, now.date_naive())?;
    let active_users = queries::count_active_accounts(&conn, now.timestamp() - ACTIVE_WINDOW_SECS)?;

    Ok(Json(DownloadStatsResponse {
        total_downloads: stats.total_downloads,
        daily_downloads: stats.daily_downloads,
        weekly_downloads: stats.weekly_downloads,
        active_users,
    }))
}
