use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct UserNote {
    pub id: String,
    pub account_id: String,
    pub note: String,
    pub created_by: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailCampaign {
    pub id: String,
    pub subject: String,
    pub message: String,
    /// Plan name, or "all"
    pub target_plan: String,
    pub recipient_count: i64,
    pub sent_by: String,
    pub sent_at: i64,
    pub status: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanCounts {
    pub total_users: i64,
    pub free_users: i64,
    pub trial_users: i64,
    pub pro_users: i64,
    pub business_users: i64,
    pub lifetime_users: i64,
    pub recent_registrations: i64,
}
