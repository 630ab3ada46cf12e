//! Repository traits
//!
//! Abstractions over the backing store. Services depend on these, the
//! `navalha-db` crate provides the PostgreSQL implementations, and
//! tests provide mocks.

use crate::error::AppError;
use crate::models::{
    ActiveSubscription, Appointment, AppointmentListing, AppointmentStatus, BenefitRule,
    NewBenefitRule, Plan, Service, SubscriptionSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Service catalog lookups
#[async_trait]
pub trait ServiceRepository: Send + Sync {
    /// Find an active service by ID; inactive services are invisible
    async fn find_active(&self, id: i32) -> Result<Option<Service>, AppError>;
}

/// Establishment lookups
#[async_trait]
pub trait EstablishmentRepository: Send + Sync {
    /// Resolve the establishment's owner (barber) ID, skipping
    /// soft-deleted establishments
    async fn find_owner(&self, id: i32) -> Result<Option<i32>, AppError>;
}

/// Plan catalog lookups
#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Find an active, non-deleted plan by ID
    async fn find_active(&self, id: i32) -> Result<Option<Plan>, AppError>;
}

/// Benefit rules and the usage history their conditions read
#[async_trait]
pub trait BenefitRepository: Send + Sync {
    /// Active rules of the subscription's plan that target `service_id`
    /// or all services, ordered ascending by position (ties by id)
    async fn rules_for_subscription(
        &self,
        subscription_id: i32,
        service_id: i32,
    ) -> Result<Vec<BenefitRule>, AppError>;

    /// Active rules of a plan in evaluation order
    async fn rules_for_plan(&self, plan_id: i32) -> Result<Vec<BenefitRule>, AppError>;

    /// Attach a new rule to a plan
    async fn create_rule(
        &self,
        plan_id: i32,
        rule: &NewBenefitRule,
    ) -> Result<BenefitRule, AppError>;

    /// Total usage records of a subscription (any service, all time)
    async fn usage_count(&self, subscription_id: i32) -> Result<i64, AppError>;

    /// Usage records of one service under a subscription within a
    /// calendar month
    async fn monthly_service_usage(
        &self,
        subscription_id: i32,
        service_id: i32,
        year: i32,
        month: u32,
    ) -> Result<i64, AppError>;
}

/// Subscription lookups and lifecycle writes
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// The benefit-granting subscription for (user, establishment):
    /// status in {ativo, free trial}, most recently created wins
    async fn find_current(
        &self,
        user_id: i32,
        establishment_id: i32,
    ) -> Result<Option<ActiveSubscription>, AppError>;

    /// How many benefit-granting subscriptions exist for the pair;
    /// anything above one violates the single-active-subscription
    /// expectation and is worth a warning
    async fn count_active(&self, user_id: i32, establishment_id: i32) -> Result<i64, AppError>;

    /// A user's non-cancelled subscriptions, newest first
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<SubscriptionSummary>, AppError>;

    /// Cancel a subscription, recording the reason and that the user
    /// initiated it. Returns false when no row matched.
    async fn cancel(&self, id: i32, reason: Option<&str>) -> Result<bool, AppError>;
}

/// Appointment lookups and status writes
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// True iff the barber already holds this exact timestamp with a
    /// pending or confirmed appointment, excluding `exclude_id`
    async fn has_conflict(
        &self,
        barber_id: i32,
        at: DateTime<Utc>,
        exclude_id: Option<i32>,
    ) -> Result<bool, AppError>;

    /// Find an appointment only if it belongs to the given client
    async fn find_owned(&self, id: i32, user_id: i32) -> Result<Option<Appointment>, AppError>;

    /// Set appointment status. Returns false when no row matched.
    async fn set_status(&self, id: i32, status: AppointmentStatus) -> Result<bool, AppError>;

    /// Move an appointment to a new timestamp, leaving status alone.
    /// `barber_id` identifies whose calendar the slot belongs to when
    /// the move collides with an existing booking.
    async fn reschedule(
        &self,
        id: i32,
        barber_id: i32,
        at: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Slot timestamps a barber holds on a given day
    async fn occupied_times(
        &self,
        barber_id: i32,
        date: NaiveDate,
    ) -> Result<Vec<DateTime<Utc>>, AppError>;

    /// A user's appointments with their latest payment, newest first
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<AppointmentListing>, AppError>;
}

/// Payment status writes
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Mark the appointment's payment complete and stamp pago_em.
    /// Returns false when the appointment has no payment row.
    async fn complete_for_appointment(&self, appointment_id: i32) -> Result<bool, AppError>;
}
