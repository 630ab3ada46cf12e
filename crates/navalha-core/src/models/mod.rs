//! Domain models for the Navalha backend

pub mod appointment;
pub mod benefit;
pub mod payment;
pub mod plan;
pub mod service;
pub mod subscription;

pub use appointment::{Appointment, AppointmentListing, AppointmentStatus};
pub use benefit::{
    AppliedBenefit, BenefitCondition, BenefitKind, BenefitOutcome, BenefitRule, NewBenefitRule,
};
pub use payment::PaymentStatus;
pub use plan::{BillingCycle, Plan};
pub use service::Service;
pub use subscription::{ActiveSubscription, SubscriptionStatus, SubscriptionSummary};
