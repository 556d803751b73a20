use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PluginEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing)]
    pub file_url: &'static str,
    pub size: &'static str,
    pub checksum: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginDownload {
    pub id: String,
    pub account_id: String,
    pub plugin_id: String,
    pub downloaded_at: i64,
}

/// Recent download joined with the account email ("Unknown" once the account is gone).
#[derive(Debug, Clone, Serialize)]
pub struct RecentPluginDownload {
    pub plugin_id: String,
    pub downloaded_at: i64,
    pub user_email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PluginDownloadCount {
    pub plugin_id: String,
    pub count: i64,
}

/// Site-wide download counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DownloadStats {
    pub total_downloads: i64,
    pub daily_downloads: i64,
    pub weekly_downloads: i64,
}
