//! Navalha Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the Navalha booking backend. It includes:
//!
//! - Domain models (Service, Plan, BenefitRule, Subscription, Appointment, Payment)
//! - Common traits for repositories
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
