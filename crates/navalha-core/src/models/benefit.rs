//! Benefit rule models
//!
//! A benefit rule is a conditional discount attached to a plan. Rules
//! are evaluated per booking in ascending `position` order and stack
//! sequentially on the running price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of discount a rule grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitKind {
    /// Percentage off the running price
    PercentDiscount,
    /// Fixed amount off, capped at the running price
    FixedDiscount,
}

impl fmt::Display for BenefitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenefitKind::PercentDiscount => write!(f, "desconto_percentual"),
            BenefitKind::FixedDiscount => write!(f, "desconto_fixo"),
        }
    }
}

impl BenefitKind {
    /// Parse from the stored label
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "desconto_percentual" => Some(BenefitKind::PercentDiscount),
            "desconto_fixo" => Some(BenefitKind::FixedDiscount),
            _ => None,
        }
    }
}

/// Condition gating a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitCondition {
    /// Unconditionally applies
    Always,
    /// Only while the subscription has zero usage records
    FirstUse,
    /// Every Nth use of the target service within the calendar month
    AfterNUses,
    /// Only on a given weekday (0 = Sunday .. 6 = Saturday)
    Weekday,
}

impl fmt::Display for BenefitCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BenefitCondition::Always => write!(f, "sempre"),
            BenefitCondition::FirstUse => write!(f, "primeira_vez"),
            BenefitCondition::AfterNUses => write!(f, "apos_x_usos"),
            BenefitCondition::Weekday => write!(f, "dia_semana"),
        }
    }
}

impl BenefitCondition {
    /// Parse from the stored label
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "sempre" => Some(BenefitCondition::Always),
            "primeira_vez" => Some(BenefitCondition::FirstUse),
            "apos_x_usos" => Some(BenefitCondition::AfterNUses),
            "dia_semana" => Some(BenefitCondition::Weekday),
            _ => None,
        }
    }
}

/// A conditional discount rule attached to a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenefitRule {
    /// Unique rule ID
    pub id: i32,

    /// Owning plan
    pub plan_id: i32,

    /// Kind of discount
    pub kind: BenefitKind,

    /// Target service; None applies to every service
    pub service_id: Option<i32>,

    /// Condition gating the rule
    pub condition: BenefitCondition,

    /// Condition parameter (N for AfterNUses, weekday index for Weekday)
    pub condition_value: Option<i32>,

    /// Percentage magnitude for PercentDiscount rules
    pub percent_off: Option<Decimal>,

    /// Fixed magnitude for FixedDiscount rules
    pub fixed_off: Option<Decimal>,

    /// Evaluation order, ascending; ties broken by insertion id
    pub position: i32,

    /// Whether the rule participates in evaluation
    pub active: bool,
}

/// Payload for attaching a new rule to a plan
#[derive(Debug, Clone, Deserialize)]
pub struct NewBenefitRule {
    pub kind: BenefitKind,
    pub service_id: Option<i32>,
    pub condition: BenefitCondition,
    pub condition_value: Option<i32>,
    pub percent_off: Option<Decimal>,
    pub fixed_off: Option<Decimal>,
    pub position: i32,
}

/// A rule that fired during evaluation, with the discount it produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedBenefit {
    /// Rule ID
    pub id: i32,

    /// Rule kind label
    pub kind: BenefitKind,

    /// Rule condition label
    pub condition: BenefitCondition,

    /// Discount amount deducted by this rule
    pub discount: Decimal,

    /// Human description in the API's language
    pub description: String,
}

/// Result of evaluating a rule set against a base price
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenefitOutcome {
    /// Price after all applied discounts, clamped at zero
    pub final_price: Decimal,

    /// Sum of all applied discounts
    pub total_discount: Decimal,

    /// Rules that fired, in application order
    pub applied: Vec<AppliedBenefit>,
}

impl BenefitOutcome {
    /// Outcome with no discount at all
    pub fn unchanged(base_price: Decimal) -> Self {
        Self {
            final_price: base_price,
            total_discount: Decimal::ZERO,
            applied: Vec::new(),
        }
    }
}
