use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Device quota for the account's plan is used up.
    #[error("Device limit reached ({current}/{max})")]
    QuotaExceeded { current: i64, max: i64 },

    #[error("Trial expired")]
    TrialExpired { expires_at: Option<i64> },

    /// Free or unrecognized plan, or a malformed plan change.
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),

    /// Storage pool, Stripe or email delivery could not be reached.
    /// Never a business outcome; callers may retry.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Database error: {0}")]
    Database(rusqlite::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trial_expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    devices_used: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_devices: Option<i64>,
}

impl ErrorBody {
    fn new(error: &str, details: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            details,
            trial_expired: None,
            devices_used: None,
            max_devices: None,
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_)
            | AppError::QuotaExceeded { .. }
            | AppError::TrialExpired { .. }
            | AppError::InvalidPlan(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::BadRequest(msg) => ErrorBody::new("Bad request", Some(msg.clone())),
            AppError::Unauthorized(msg) => ErrorBody::new("Unauthorized", Some(msg.clone())),
            AppError::Forbidden(msg) => ErrorBody::new("Forbidden", Some(msg.clone())),
            AppError::NotFound(msg) => ErrorBody::new("Not found", Some(msg.clone())),
            AppError::QuotaExceeded { current, max } => ErrorBody {
                devices_used: Some(*current),
                max_devices: Some(*max),
                ..ErrorBody::new(
                    "Device limit reached",
                    Some(format!(
                        "Your plan allows {} device(s). You have {} devices registered.",
                        max, current
                    )),
                )
            },
            AppError::TrialExpired { .. } => ErrorBody {
                trial_expired: Some(true),
                ..ErrorBody::new(
                    "Trial expired",
                    Some("Your free trial has expired. Upgrade to continue.".into()),
                )
            },
            AppError::InvalidPlan(msg) => ErrorBody::new("Invalid plan", Some(msg.clone())),
            AppError::UpstreamUnavailable(msg) => {
                tracing::error!("Upstream unavailable: {}", msg);
                ErrorBody::new("Service unavailable", None)
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                ErrorBody::new("Database error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorBody::new("Internal server error", None)
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        // A writer held the lock past the busy timeout; retryable.
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                AppError::UpstreamUnavailable(format!("Database busy: {}", err))
            }
            _ => AppError::Database(err),
        }
    }
}

impl From<r2d2::Error> for AppError {
    fn from(err: r2d2::Error) -> Self {
        AppError::UpstreamUnavailable(format!("Connection pool: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UpstreamUnavailable(format!("HTTP request failed: {}", err))
    }
}
