//! Service catalog model
//!
//! A service is a priced offering (corte, barba, pacote). Its base
//! price is the starting point of every benefit evaluation; bookings
//! snapshot the resulting price into the payment row, so the catalog
//! row itself is never rewritten retroactively.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bookable service with its catalog price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Unique service ID
    pub id: i32,

    /// Display name (e.g., "Corte + Barba")
    pub name: String,

    /// Catalog base price, 2 decimal places
    pub base_price: Decimal,

    /// Whether the service can still be booked
    pub active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_service_price_is_decimal() {
        let service = Service {
            id: 1,
            name: "Corte Simples".to_string(),
            base_price: dec!(25.00),
            active: true,
        };

        assert_eq!(service.base_price, dec!(25.00));
        // 2dp survives serialization round-trips
        let json = serde_json::to_string(&service).unwrap();
        let back: Service = serde_json::from_str(&json).unwrap();
        assert_eq!(back.base_price, service.base_price);
    }
}
