//! Subscription (inscrição) models
//!
//! A subscription enrolls a user in a plan at an establishment. Only
//! `ativo` and `free trial` rows count for benefit evaluation; at most
//! one per (user, establishment) is expected, and duplicates resolve
//! to the most recently created row.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    FreeTrial,
    Overdue,
    Cancelled,
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "ativo"),
            SubscriptionStatus::FreeTrial => write!(f, "free trial"),
            SubscriptionStatus::Overdue => write!(f, "atrasado"),
            SubscriptionStatus::Cancelled => write!(f, "cancelado"),
        }
    }
}

impl SubscriptionStatus {
    /// Parse from the stored label
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ativo" => Some(SubscriptionStatus::Active),
            "free trial" => Some(SubscriptionStatus::FreeTrial),
            "atrasado" => Some(SubscriptionStatus::Overdue),
            "cancelado" => Some(SubscriptionStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether this status grants plan benefits
    pub fn grants_benefits(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::FreeTrial
        )
    }
}

/// The subscription a booking resolves benefits against
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSubscription {
    /// Subscription ID
    pub id: i32,

    /// Plan the user is enrolled in
    pub plan_id: i32,

    /// Plan display name (for logs and responses)
    pub plan_name: String,
}

/// Read-model row for a user's subscription list
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummary {
    pub id: i32,
    pub status: SubscriptionStatus,
    pub start_date: NaiveDate,
    pub next_billing_date: NaiveDate,
    pub current_period_price: Decimal,
    pub plan_name: Option<String>,
    pub plan_description: Option<String>,
    pub cycle: Option<String>,
    pub establishment_id: Option<i32>,
    pub establishment_name: Option<String>,
    pub created_at: DateTime<Utc>,
}
