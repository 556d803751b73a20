use crate::models::{Account, Plan};

use super::plans::{SECONDS_PER_DAY, trial_expiry_from};
use super::pricing::PriceTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutMode {
    OneTime,
    Subscription,
}

/// A payment-provider notification, already authenticated and normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEvent {
    CheckoutCompleted {
        customer_email: String,
        customer_id: Option<String>,
        price_id: String,
        mode: CheckoutMode,
        subscription_id: Option<String>,
    },
    SubscriptionUpdated {
        customer_id: String,
        price_id: String,
        subscription_id: String,
    },
    SubscriptionCancelled {
        customer_id: String,
    },
}

/// Which account an event targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelector {
    /// Normalized email address
    Email(String),
    /// Payment-provider customer id stored on the account
    CustomerId(String),
}

/// A state change to apply to one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanChange {
    /// Move to a paid plan. `None` ids keep what is stored, except that
    /// lifetime always clears the subscription.
    Activate {
        plan: Plan,
        subscription_id: Option<String>,
        customer_id: Option<String>,
    },
    /// Subscription ended: back to an already-expired trial.
    Revoke,
    /// Admin-chosen plan.
    Override(Plan),
}

/// The account fields a plan change writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanUpdate {
    pub plan: Plan,
    pub max_devices: i64,
    pub trial_expires_at: Option<i64>,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
}

/// What `resolve` decided for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Apply {
        selector: AccountSelector,
        change: PlanChange,
    },
    /// Nothing to do; the reason is logged.
    Ignore(String),
}

/// Result of applying a change to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingOutcome {
    Applied(PlanUpdate),
    /// The account already matched; nothing was written.
    Unchanged,
    AccountNotFound,
}

impl BillingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BillingEvent::CheckoutCompleted { .. } => "checkout_completed",
            BillingEvent::SubscriptionUpdated { .. } => "subscription_updated",
            BillingEvent::SubscriptionCancelled { .. } => "subscription_cancelled",
        }
    }
}

/// Map a billing event to the account it targets and the change to make.
///
/// Prices are matched against the configured table only. A one-time checkout
/// on the lifetime price grants lifetime; every other match must be a pro or
/// business price. Subscription updates never grant lifetime.
pub fn resolve(event: &BillingEvent, prices: &PriceTable) -> Resolution {
    match event {
        BillingEvent::CheckoutCompleted {
            customer_email,
            customer_id,
            price_id,
            mode,
            subscription_id,
        } => {
            let Some(entry) = prices.lookup(price_id) else {
                return Resolution::Ignore(format!("unmatched price {}", price_id));
            };
            let selector = AccountSelector::Email(crate::util::normalize_email(customer_email));

            match (entry.plan, mode) {
                (Plan::Lifetime, CheckoutMode::OneTime) => Resolution::Apply {
                    selector,
                    change: PlanChange::Activate {
                        plan: Plan::Lifetime,
                        subscription_id: None,
                        customer_id: customer_id.clone(),
                    },
                },
                (Plan::Lifetime, CheckoutMode::Subscription) => Resolution::Ignore(format!(
                    "lifetime price {} used in subscription checkout",
                    price_id
                )),
                (plan @ (Plan::Pro | Plan::Business), _) => Resolution::Apply {
                    selector,
                    change: PlanChange::Activate {
                        plan,
                        subscription_id: subscription_id.clone(),
                        customer_id: customer_id.clone(),
                    },
                },
                (plan, _) => Resolution::Ignore(format!("price {} maps to {}", price_id, plan)),
            }
        }
        BillingEvent::SubscriptionUpdated {
            customer_id,
            price_id,
            subscription_id,
        } => match prices.lookup(price_id).map(|e| e.plan) {
            Some(plan @ (Plan::Pro | Plan::Business)) => Resolution::Apply {
                selector: AccountSelector::CustomerId(customer_id.clone()),
                change: PlanChange::Activate {
                    plan,
                    subscription_id: Some(subscription_id.clone()),
                    customer_id: None,
                },
            },
            Some(plan) => Resolution::Ignore(format!(
                "subscription price {} maps to {}",
                price_id, plan
            )),
            None => Resolution::Ignore(format!("unmatched price {}", price_id)),
        },
        BillingEvent::SubscriptionCancelled { customer_id } => Resolution::Apply {
            selector: AccountSelector::CustomerId(customer_id.clone()),
            change: PlanChange::Revoke,
        },
    }
}

impl PlanChange {
    /// Compute the account fields after this change at `now`.
    ///
    /// Pure "set" semantics: applying the result and then applying the same
    /// change again yields the same update.
    pub fn apply(&self, account: &Account, now: i64) -> PlanUpdate {
        match self {
            PlanChange::Activate {
                plan,
                subscription_id,
                customer_id,
            } => PlanUpdate {
                plan: *plan,
                max_devices: plan.max_devices(),
                trial_expires_at: None,
                subscription_id: match plan {
                    Plan::Lifetime => None,
                    _ => subscription_id
                        .clone()
                        .or_else(|| account.subscription_id.clone()),
                },
                customer_id: customer_id
                    .clone()
                    .or_else(|| account.stripe_customer_id.clone()),
            },
            PlanChange::Revoke => {
                // An earlier revocation already left an expired trial behind;
                // keep its timestamp so redeliveries converge.
                let trial_expires_at = match (account.plan, account.trial_expires_at) {
                    (Some(Plan::Trial), Some(expiry)) if expiry < now => expiry,
                    _ => now - SECONDS_PER_DAY,
                };
                PlanUpdate {
                    plan: Plan::Trial,
                    max_devices: Plan::Trial.max_devices(),
                    trial_expires_at: Some(trial_expires_at),
                    subscription_id: None,
                    customer_id: account.stripe_customer_id.clone(),
                }
            }
            PlanChange::Override(plan) => PlanUpdate {
                plan: *plan,
                max_devices: plan.max_devices(),
                trial_expires_at: match plan {
                    Plan::Trial => Some(trial_expiry_from(now)),
                    _ => None,
                },
                subscription_id: account.subscription_id.clone(),
                customer_id: account.stripe_customer_id.clone(),
            },
        }
    }
}

impl PlanUpdate {
    /// True when writing this update would leave the account as it is.
    pub fn matches(&self, account: &Account) -> bool {
        account.plan == Some(self.plan)
            && account.max_devices == self.max_devices
            && account.trial_expires_at == self.trial_expires_at
            && account.subscription_id == self.subscription_id
            && account.stripe_customer_id == self.customer_id
    }
}
