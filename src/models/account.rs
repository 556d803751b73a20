use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use super::Device;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Plan {
    Free,
    Trial,
    Pro,
    Business,
    Lifetime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    /// Lowercase-normalized, unique
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Parsed plan; `None` when the stored value is not a recognized plan.
    #[serde(skip)]
    pub plan: Option<Plan>,
    /// Plan exactly as stored
    #[serde(rename = "plan")]
    pub plan_name: String,
    /// Set if and only if plan is trial
    pub trial_expires_at: Option<i64>,
    pub max_devices: i64,
    pub devices: Vec<Device>,
    pub stripe_customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub is_admin: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub plan_updated_at: Option<i64>,
    pub last_login_at: Option<i64>,
    pub last_active_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Public view of an account returned by auth endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub plan: String,
    pub is_admin: bool,
    pub trial_expires_at: Option<i64>,
    pub max_devices: i64,
    pub devices: Vec<Device>,
}

impl AccountSummary {
    pub fn new(account: &Account, is_admin: bool) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            plan: account.plan_name.clone(),
            is_admin,
            trial_expires_at: account.trial_expires_at,
            max_devices: account.max_devices,
            devices: account.devices.clone(),
        }
    }
}
