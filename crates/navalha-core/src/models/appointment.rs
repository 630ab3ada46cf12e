//! Appointment model and state machine
//!
//! A slot is a (barber, exact timestamp) pair. The slot is exclusive
//! while the appointment is pending or confirmed; cancelling frees it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pendente"),
            AppointmentStatus::Confirmed => write!(f, "confirmado"),
            AppointmentStatus::Cancelled => write!(f, "cancelado"),
        }
    }
}

impl AppointmentStatus {
    /// Parse from the stored label
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pendente" => Some(AppointmentStatus::Pending),
            "confirmado" => Some(AppointmentStatus::Confirmed),
            "cancelado" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Whether this status holds the slot for conflict purposes
    pub fn holds_slot(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }

    /// Valid transitions: pending -> confirmed | cancelled,
    /// confirmed -> cancelled, no exit from cancelled.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        match (self, next) {
            (AppointmentStatus::Pending, AppointmentStatus::Confirmed) => true,
            (AppointmentStatus::Pending, AppointmentStatus::Cancelled) => true,
            (AppointmentStatus::Confirmed, AppointmentStatus::Cancelled) => true,
            _ => false,
        }
    }
}

/// A booked appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique appointment ID
    pub id: i32,

    /// Client who booked
    pub client_id: i32,

    /// Barber (establishment owner at booking time)
    pub barber_id: i32,

    /// Establishment the booking belongs to
    pub establishment_id: i32,

    /// Exact slot timestamp
    pub scheduled_at: DateTime<Utc>,

    /// Current status
    pub status: AppointmentStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Read-model row for a user's appointment list, joined with the
/// latest payment for display.
#[derive(Debug, Clone, Serialize)]
pub struct AppointmentListing {
    pub id: i32,
    pub user_id: i32,
    pub establishment_id: i32,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub user_name: Option<String>,
    pub establishment_name: Option<String>,
    pub payment_status: Option<String>,
    pub amount: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_round_trip() {
        for status in [
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
        ] {
            assert_eq!(
                AppointmentStatus::from_str(&status.to_string()),
                Some(status)
            );
        }
        assert_eq!(AppointmentStatus::from_str("finalizado"), None);
    }

    #[test]
    fn test_slot_holding() {
        assert!(AppointmentStatus::Pending.holds_slot());
        assert!(AppointmentStatus::Confirmed.holds_slot());
        assert!(!AppointmentStatus::Cancelled.holds_slot());
    }

    #[test]
    fn test_state_machine() {
        use AppointmentStatus::*;

        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));

        // no exit from cancelled
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        // no backwards transition
        assert!(!Confirmed.can_transition_to(Pending));
    }
}
