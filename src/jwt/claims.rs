use serde::{Deserialize, Serialize};

/// Custom claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub account_id: String,
    pub email: String,
    /// Admin status at login time. Admin routes re-check against storage.
    pub is_admin: bool,
}

/// A verified caller, as inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub account_id: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<SessionClaims> for Identity {
    fn from(claims: SessionClaims) -> Self {
        Self {
            account_id: claims.account_id,
            email: claims.email,
            is_admin: claims.is_admin,
        }
    }
}
