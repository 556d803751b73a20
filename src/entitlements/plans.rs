use serde::Serialize;

use crate::models::Plan;

pub const SECONDS_PER_HOUR: i64 = 3600;
pub const SECONDS_PER_DAY: i64 = 86400;

/// Length of the trial granted at registration.
pub const TRIAL_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanFeatures {
    pub max_devices: i64,
    pub cloud_sync: bool,
    pub priority_support: bool,
}

const FREE_FEATURES: PlanFeatures = PlanFeatures {
    max_devices: 1,
    cloud_sync: false,
    priority_support: false,
};

/// Per-plan grants. Registration, license checks and plan transitions all read
/// device quotas from here.
const PLAN_FEATURES: &[(Plan, PlanFeatures)] = &[
    (Plan::Free, FREE_FEATURES),
    (
        Plan::Trial,
        PlanFeatures {
            max_devices: 1,
            cloud_sync: false,
            priority_support: false,
        },
    ),
    (
        Plan::Pro,
        PlanFeatures {
            max_devices: 3,
            cloud_sync: true,
            priority_support: true,
        },
    ),
    (
        Plan::Business,
        PlanFeatures {
            max_devices: 10,
            cloud_sync: true,
            priority_support: true,
        },
    ),
    (
        Plan::Lifetime,
        PlanFeatures {
            max_devices: 3,
            cloud_sync: false,
            priority_support: false,
        },
    ),
];

impl Plan {
    pub fn features(self) -> PlanFeatures {
        PLAN_FEATURES
            .iter()
            .find(|(plan, _)| *plan == self)
            .map(|(_, features)| *features)
            .unwrap_or(FREE_FEATURES)
    }

    pub fn max_devices(self) -> i64 {
        self.features().max_devices
    }

    /// Paid plans are valid regardless of time.
    pub fn is_paid(self) -> bool {
        matches!(self, Plan::Pro | Plan::Business | Plan::Lifetime)
    }
}

/// Expiry of a trial window opened at `now`.
pub fn trial_expiry_from(now: i64) -> i64 {
    now + TRIAL_DAYS * SECONDS_PER_DAY
}
