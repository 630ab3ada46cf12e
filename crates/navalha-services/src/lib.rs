//! Business logic services for the Navalha backend
//!
//! This crate contains the services that orchestrate bookings and
//! subscriptions on top of the repository layer.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies (repositories, pool, config)
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - All operations are instrumented with tracing
//! - Comprehensive error handling with AppError
//!
//! # Services
//!
//! - `BenefitEvaluator` - Ordered, compounding discount evaluation
//! - `PlanBenefitsService` - Plan benefit rule administration
//! - `BookingCoordinator` - Atomic appointment + payment + usage writes
//! - `SubscriptionLifecycle` - Enrollment and cancellation with
//!   calendar-aware billing dates

pub mod benefits;
pub mod booking;
pub mod subscription_lifecycle;

pub use benefits::{BenefitEvaluator, PlanBenefitsService};
pub use booking::{BookingConfirmation, BookingCoordinator, BookingRequest};
pub use subscription_lifecycle::{
    enrollment_schedule, EnrollmentReceipt, EnrollmentRequest, EnrollmentSchedule,
    SubscriptionLifecycle,
};

use navalha_db::{
    PgAppointmentRepository, PgBenefitRepository, PgEstablishmentRepository, PgPaymentRepository,
    PgPlanRepository, PgServiceRepository, PgSubscriptionRepository,
};

/// The coordinator wired to the PostgreSQL repositories
pub type PgBookingCoordinator = BookingCoordinator<
    PgServiceRepository,
    PgEstablishmentRepository,
    PgSubscriptionRepository,
    PgBenefitRepository,
    PgAppointmentRepository,
    PgPaymentRepository,
>;

/// The lifecycle service wired to the PostgreSQL repositories
pub type PgSubscriptionLifecycle =
    SubscriptionLifecycle<PgPlanRepository, PgSubscriptionRepository>;

/// Plan benefit administration wired to the PostgreSQL repositories
pub type PgPlanBenefitsService = PlanBenefitsService<PgPlanRepository, PgBenefitRepository>;
