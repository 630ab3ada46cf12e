//! Data Transfer Objects (DTOs) for API requests and responses

pub mod benefit;
pub mod booking;
pub mod subscription;

pub use benefit::*;
pub use booking::*;
pub use subscription::*;

use rust_decimal::Decimal;

/// Monetary values leave the API as plain JSON numbers
pub(crate) fn dec_to_f64(value: Decimal) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}
