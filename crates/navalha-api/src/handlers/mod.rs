//! HTTP request handlers

pub mod appointment;
pub mod benefit;
pub mod subscription;

pub use appointment::configure as configure_appointments;
pub use benefit::configure as configure_plan_benefits;
pub use subscription::configure as configure_subscriptions;
