use std::str::FromStr;

use axum::extract::{Extension, State};
use serde::{Deserialize, Serialize};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::jwt::Identity;
use crate::models::{EmailCampaign, Plan};

/// Audience value that targets every account.
const ALL_PLANS: &str = "all";

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub subject: String,
    pub message: String,
    #[serde(default)]
    pub target_plan: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CampaignResponse {
    pub success: bool,
    pub message: String,
    pub campaign: EmailCampaign,
}

#[derive(Debug, Serialize)]
pub struct CampaignListResponse {
    pub campaigns: Vec<EmailCampaign>,
}

/// GET /admin/campaigns - The 20 most recent campaigns
pub async fn list_campaigns(State(state): State<AppState>) -> Result<Json<CampaignListResponse>> {
    let conn = state.db.get()?;
    Ok(Json(CampaignListResponse {
        campaigns: queries::list_campaigns(&conn)?,
    }))
}

/// POST /admin/campaigns - Record a campaign for a plan audience
///
/// Only the campaign and its recipient count are stored; delivery is left
/// to the mailing provider.
pub async fn create_campaign(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Json(input): Json<CreateCampaignRequest>,
) -> Result<Json<CampaignResponse>> {
    let subject = input.subject.trim();
    let message = input.message.trim();
    if subject.is_empty() || message.is_empty() {
        return Err(AppError::BadRequest("Subject and message are required".into()));
    }

    let target = input
        .target_plan
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(ALL_PLANS);
    let plan = match target {
        ALL_PLANS => None,
        other => Some(
            Plan::from_str(other)
                .map_err(|_| AppError::BadRequest(format!("Invalid target plan: {}", other)))?,
        ),
    };

    let conn = state.db.get()?;
    let recipients = queries::list_emails_for_plan(&conn, plan)?;
    let campaign = queries::create_campaign(
        &conn,
        subject,
        message,
        target,
        recipients.len() as i64,
        &admin.email,
    )?;

    tracing::info!(
        admin = %admin.email,
        campaign_id = %campaign.id,
        recipients = recipients.len(),
        "ADMIN: Campaign recorded"
    );

    Ok(Json(CampaignResponse {
        success: true,
        message: format!("Campaign recorded for {} recipient(s)", recipients.len()),
        campaign,
    }))
}
