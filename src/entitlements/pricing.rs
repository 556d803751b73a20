use std::env;

use serde::Deserialize;
use strum::{AsRefStr, Display, EnumString};

use crate::models::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, AsRefStr, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BillingInterval {
    Monthly,
    Yearly,
    OneTime,
}

/// A configured price and what it buys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceEntry {
    pub price_id: String,
    pub plan: Plan,
    pub interval: BillingInterval,
}

/// The one price→plan mapping used by checkout, webhooks and license checks.
///
/// Built once from configuration; lookups never fall back to guessing from the
/// price id's shape.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    entries: Vec<PriceEntry>,
}

impl PriceTable {
    pub fn new(entries: Vec<PriceEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| PriceEntry {
                price_id: clean_price_id(&e.price_id),
                ..e
            })
            .filter(|e| !e.price_id.is_empty())
            .collect();
        Self { entries }
    }

    /// Read `PRICE_PRO_MONTHLY`, `PRICE_PRO_YEARLY`, `PRICE_BUSINESS_MONTHLY`,
    /// `PRICE_BUSINESS_YEARLY` and `PRICE_LIFETIME`. Unset variables are skipped.
    pub fn from_env() -> Self {
        let slots = [
            ("PRICE_PRO_MONTHLY", Plan::Pro, BillingInterval::Monthly),
            ("PRICE_PRO_YEARLY", Plan::Pro, BillingInterval::Yearly),
            ("PRICE_BUSINESS_MONTHLY", Plan::Business, BillingInterval::Monthly),
            ("PRICE_BUSINESS_YEARLY", Plan::Business, BillingInterval::Yearly),
            ("PRICE_LIFETIME", Plan::Lifetime, BillingInterval::OneTime),
        ];

        let entries = slots
            .into_iter()
            .filter_map(|(var, plan, interval)| {
                env::var(var).ok().map(|price_id| PriceEntry {
                    price_id,
                    plan,
                    interval,
                })
            })
            .collect();

        Self::new(entries)
    }

    pub fn lookup(&self, price_id: &str) -> Option<&PriceEntry> {
        let price_id = clean_price_id(price_id);
        self.entries.iter().find(|e| e.price_id == price_id)
    }

    pub fn price_for(&self, plan: Plan, interval: BillingInterval) -> Option<&PriceEntry> {
        self.entries
            .iter()
            .find(|e| e.plan == plan && e.interval == interval)
    }

    pub fn entries(&self) -> &[PriceEntry] {
        &self.entries
    }
}

/// Trim whitespace and any quotes left over from `.env` files.
pub fn clean_price_id(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Price ids copied from sample configuration rather than the Stripe dashboard.
pub fn is_placeholder(price_id: &str) -> bool {
    price_id.contains("1234567890") || price_id.contains("your_")
}

#[cfg(test)]
pub(crate) fn test_price_table() -> PriceTable {
    PriceTable::new(vec![
        PriceEntry {
            price_id: "price_pro_m".into(),
            plan: Plan::Pro,
            interval: BillingInterval::Monthly,
        },
        PriceEntry {
            price_id: "price_pro_y".into(),
            plan: Plan::Pro,
            interval: BillingInterval::Yearly,
        },
        PriceEntry {
            price_id: "price_biz_m".into(),
            plan: Plan::Business,
            interval: BillingInterval::Monthly,
        },
        PriceEntry {
            price_id: "price_biz_y".into(),
            plan: Plan::Business,
            interval: BillingInterval::Yearly,
        },
        PriceEntry {
            price_id: "price_life".into(),
            plan: Plan::Lifetime,
            interval: BillingInterval::OneTime,
        },
    ])
}
