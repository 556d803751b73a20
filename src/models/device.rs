use serde::{Deserialize, Serialize};

/// A device registered against an account's quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub account_id: String,
    /// Opaque hash of client network address + user-agent
    pub fingerprint: String,
    pub name: String,
    pub registered_at: i64,
    pub last_used_at: i64,
}
