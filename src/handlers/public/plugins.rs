use serde::Serialize;

use crate::catalog::PLUGIN_CATALOG;
use crate::extractors::Json;
use crate::models::PluginEntry;

#[derive(Debug, Serialize)]
pub struct PluginListResponse {
    pub plugins: &'static [PluginEntry],
    pub total: usize,
}

/// GET /plugins - Public catalog listing (download URLs withheld)
pub async fn list_plugins() -> Json<PluginListResponse> {
    Json(PluginListResponse {
        plugins: PLUGIN_CATALOG,
        total: PLUGIN_CATALOG.len(),
    })
}
