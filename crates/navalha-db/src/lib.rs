//! Navalha Database Layer
//!
//! This crate provides PostgreSQL database access and repository
//! implementations for the Navalha backend. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for all domain entities
//! - Transaction support for atomic booking/enrollment writes

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use navalha_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
