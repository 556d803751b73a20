use jwt_simple::prelude::*;

use crate::error::{AppError, Result};

use super::claims::{Identity, SessionClaims};

const ISSUER: &str = "omega";
const SESSION_DAYS: u64 = 30;

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct SessionSigner {
    key: HS256Key,
}

impl SessionSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: HS256Key::from_bytes(secret.as_bytes()),
        }
    }

    /// Sign a 30-day session token for `claims`.
    pub fn issue(&self, claims: SessionClaims) -> Result<String> {
        let subject = claims.account_id.clone();
        let claims = Claims::with_custom_claims(claims, Duration::from_days(SESSION_DAYS))
            .with_issuer(ISSUER)
            .with_subject(subject);

        self.key
            .authenticate(claims)
            .map_err(|e| AppError::Internal(format!("Failed to sign session token: {}", e)))
    }

    /// Verify signature, issuer and expiry. Any failure is `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<Identity> {
        let options = VerificationOptions {
            allowed_issuers: Some(HashSet::from_strings(&[ISSUER])),
            ..Default::default()
        };

        let claims = self
            .key
            .verify_token::<SessionClaims>(token, Some(options))
            .map_err(|e| {
                tracing::debug!("Session token rejected: {}", e);
                AppError::Unauthorized("Invalid or expired token".into())
            })?;

        Ok(claims.custom.into())
    }
}
