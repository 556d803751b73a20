use axum::{Extension, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::catalog::find_plugin;
use crate::db::{AppState, queries};
use crate::entitlements::evaluate;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::jwt::Identity;

#[derive(Debug, Deserialize)]
pub struct PluginDownloadRequest {
    pub plugin_id: String,
}

#[derive(Debug, Serialize)]
pub struct PluginDownloadResponse {
    pub success: bool,
    pub plugin_id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub download_url: &'static str,
    pub size: &'static str,
    pub checksum: &'static str,
}

/// POST /download/plugin - Download link for a catalog plugin (paid plans only)
pub async fn download_plugin(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(input): Json<PluginDownloadRequest>,
) -> Result<Json<PluginDownloadResponse>> {
    let conn = state.db.get()?;
    let account = queries::get_account_by_id(&conn, &identity.account_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let (plan, _) = evaluate(&account, Utc::now().timestamp()).into_result()?;
    if !plan.is_paid() {
        return Err(AppError::Forbidden(
            "Plugins require a Pro, Business, or Lifetime plan".into(),
        ));
    }

    let plugin = find_plugin(input.plugin_id.trim())
        .ok_or_else(|| AppError::NotFound("Plugin not found".into()))?;

    if let Err(e) = queries::record_plugin_download(&conn, &account.id, plugin.id) {
        tracing::warn!(plugin_id = plugin.id, "Failed to record plugin download: {}", e);
    }

    Ok(Json(PluginDownloadResponse {
        success: true,
        plugin_id: plugin.id,
        name: plugin.name,
        version: plugin.version,
        download_url: plugin.file_url,
        size: plugin.size,
        checksum: plugin.checksum,
    }))
}
