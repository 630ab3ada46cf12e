//! PostgreSQL repository implementations

pub mod appointment_repo;
pub mod benefit_repo;
pub mod establishment_repo;
pub mod payment_repo;
pub mod plan_repo;
pub mod service_repo;
pub mod subscription_repo;

pub use appointment_repo::PgAppointmentRepository;
pub use benefit_repo::PgBenefitRepository;
pub use establishment_repo::PgEstablishmentRepository;
pub use payment_repo::PgPaymentRepository;
pub use plan_repo::PgPlanRepository;
pub use service_repo::PgServiceRepository;
pub use subscription_repo::PgSubscriptionRepository;
