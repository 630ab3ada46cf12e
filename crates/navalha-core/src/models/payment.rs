//! Payment status model
//!
//! A payment row is created in the same transaction as the appointment
//! or subscription that originates it, and always references exactly
//! one of the two. Completion is independent of appointment status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Complete,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pendente"),
            PaymentStatus::Complete => write!(f, "completo"),
            PaymentStatus::Refunded => write!(f, "reembolsado"),
        }
    }
}

impl PaymentStatus {
    /// Parse from the stored label
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pendente" => Some(PaymentStatus::Pending),
            "completo" => Some(PaymentStatus::Complete),
            "reembolsado" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}
