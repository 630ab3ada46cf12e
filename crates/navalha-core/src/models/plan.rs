//! Subscription plan model
//!
//! Plans are priced bundles created by one establishment. Billing is
//! cyclical (monthly/quarterly/annual) with an optional free-trial
//! window that defers the first charge.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Plan billing cycle
///
/// Stored as Portuguese labels so existing rows stay readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Annual,
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingCycle::Monthly => write!(f, "mensalmente"),
            BillingCycle::Quarterly => write!(f, "quartenamente"),
            BillingCycle::Annual => write!(f, "anual"),
        }
    }
}

impl BillingCycle {
    /// Parse from the stored label
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mensalmente" => Some(BillingCycle::Monthly),
            "quartenamente" => Some(BillingCycle::Quarterly),
            "anual" => Some(BillingCycle::Annual),
            _ => None,
        }
    }

    /// Cycle length in calendar months
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::Annual => 12,
        }
    }

    /// Advance a date by one cycle, calendar-aware (not fixed day counts).
    /// End-of-month dates clamp to the last valid day of the target month.
    pub fn advance(&self, from: NaiveDate) -> NaiveDate {
        from.checked_add_months(chrono::Months::new(self.months()))
            .unwrap_or(from)
    }
}

/// A subscription plan owned by its creator establishment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique plan ID
    pub id: i32,

    /// Establishment that created (and owns) the plan
    pub creator_establishment_id: i32,

    /// Establishment the subscription binds to on enrollment
    pub establishment_id: i32,

    /// Display name
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Recurring price per cycle
    pub price: Decimal,

    /// Billing cycle
    pub cycle: BillingCycle,

    /// Free-trial length in days (0 = no trial)
    pub trial_days: i32,

    /// Whether other establishments may join via partnership
    pub is_public: bool,

    /// Whether the plan accepts new subscriptions
    pub active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Whether enrollment starts with a free trial
    pub fn has_trial(&self) -> bool {
        self.trial_days > 0
    }
}
