use serde::Serialize;

use crate::error::AppError;
use crate::models::{Account, Plan};

use super::plans::{PlanFeatures, SECONDS_PER_DAY, SECONDS_PER_HOUR};

/// Remaining time on a trial that is still running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrialStatus {
    pub expires_at: i64,
    pub days_left: i64,
    pub hours_left: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    FreePlan,
    /// The stored plan string is not one we know.
    UnrecognizedPlan(String),
}

/// Whether an account may use the product at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entitlement {
    Valid {
        plan: Plan,
        features: PlanFeatures,
        /// Present only for trial accounts
        trial: Option<TrialStatus>,
    },
    TrialExpired {
        expires_at: Option<i64>,
    },
    Invalid {
        reason: InvalidReason,
    },
}

impl Entitlement {
    pub fn is_valid(&self) -> bool {
        matches!(self, Entitlement::Valid { .. })
    }

    /// Convert to the plan/features pair, or the business error for callers
    /// that only proceed on a valid entitlement.
    pub fn into_result(self) -> Result<(Plan, PlanFeatures), AppError> {
        match self {
            Entitlement::Valid { plan, features, .. } => Ok((plan, features)),
            Entitlement::TrialExpired { expires_at } => Err(AppError::TrialExpired { expires_at }),
            Entitlement::Invalid { reason } => Err(AppError::InvalidPlan(reason.to_string())),
        }
    }
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidReason::FreePlan => write!(f, "free"),
            InvalidReason::UnrecognizedPlan(plan) if plan.is_empty() => write!(f, "unknown"),
            InvalidReason::UnrecognizedPlan(plan) => write!(f, "{}", plan),
        }
    }
}

/// Decide an account's entitlement at `now` (unix seconds).
///
/// Paid plans are valid at any time. A trial is valid up to and including the
/// second it expires; a trial without an expiry is treated as expired.
pub fn evaluate(account: &Account, now: i64) -> Entitlement {
    let Some(plan) = account.plan else {
        return Entitlement::Invalid {
            reason: InvalidReason::UnrecognizedPlan(account.plan_name.clone()),
        };
    };

    match plan {
        Plan::Free => Entitlement::Invalid {
            reason: InvalidReason::FreePlan,
        },
        Plan::Trial => match account.trial_expires_at {
            Some(expires_at) if now <= expires_at => Entitlement::Valid {
                plan,
                features: plan.features(),
                trial: Some(trial_status(expires_at, now)),
            },
            expires_at => Entitlement::TrialExpired { expires_at },
        },
        Plan::Pro | Plan::Business | Plan::Lifetime => Entitlement::Valid {
            plan,
            features: plan.features(),
            trial: None,
        },
    }
}

fn trial_status(expires_at: i64, now: i64) -> TrialStatus {
    let remaining = expires_at.saturating_sub(now).max(0);
    let days_left = ceil_div(remaining, SECONDS_PER_DAY);
    let hours_left = ceil_div(remaining, SECONDS_PER_HOUR);

    let message = if days_left <= 1 {
        format!(
            "Your trial expires in {} hour(s). Upgrade now to keep using JARVIS!",
            hours_left
        )
    } else {
        format!("You have {} day(s) left in your trial.", days_left)
    };

    TrialStatus {
        expires_at,
        days_left,
        hours_left,
        message,
    }
}

/// Rounds up; `value` is non-negative.
fn ceil_div(value: i64, unit: i64) -> i64 {
    value / unit + i64::from(value % unit > 0)
}
