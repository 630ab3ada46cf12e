//! API layer for the Navalha backend
//!
//! HTTP handlers and DTOs for the booking and subscription endpoints.
//! The wire format uses Portuguese field names; errors come back as
//! `{"erro": "<mensagem>"}`.

pub mod dto;
pub mod handlers;

pub use handlers::{configure_appointments, configure_plan_benefits, configure_subscriptions};
