//! Unified error handling for the Navalha backend
//!
//! All failures are converted to `AppError`, which implements
//! `ResponseError` so handlers can bubble errors with `?`. Response
//! bodies use the `{"erro": "<mensagem>"}` wire format.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Business Logic Errors ====================
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    #[error("Establishment not found: {0}")]
    EstablishmentNotFound(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(String),

    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    #[error("Payment not found for appointment: {0}")]
    PaymentNotFound(String),

    #[error("Slot already booked for barber {barber_id} at {at}")]
    SlotTaken { barber_id: i32, at: String },

    // ==================== Validation Errors ====================
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    // ==================== Resource Errors ====================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation(_) | AppError::MissingField(_) => StatusCode::BAD_REQUEST,

            // 403 Forbidden
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::ServiceNotFound(_)
            | AppError::EstablishmentNotFound(_)
            | AppError::PlanNotFound(_)
            | AppError::AppointmentNotFound(_)
            | AppError::SubscriptionNotFound(_)
            | AppError::PaymentNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::SlotTaken { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message, in Portuguese.
    ///
    /// Internal errors collapse to a generic message; details stay in
    /// the server logs only.
    pub fn public_message(&self) -> String {
        match self {
            AppError::ServiceNotFound(_) => "Serviço não encontrado".to_string(),
            AppError::EstablishmentNotFound(_) => "Estabelecimento não encontrado".to_string(),
            AppError::PlanNotFound(_) => "Plano não encontrado ou inativo".to_string(),
            AppError::AppointmentNotFound(_) => "Agendamento não encontrado".to_string(),
            AppError::SubscriptionNotFound(_) => "Inscrição não encontrada".to_string(),
            AppError::PaymentNotFound(_) => {
                "Pagamento não encontrado para este agendamento".to_string()
            }
            AppError::SlotTaken { .. } => {
                "Este horário já está ocupado. Por favor, escolha outro horário.".to_string()
            }
            AppError::Validation(msg) | AppError::MissingField(msg) => msg.clone(),
            AppError::NotFound(msg) | AppError::Conflict(msg) | AppError::Forbidden(msg) => {
                msg.clone()
            }
            _ => "Erro interno do servidor".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        HttpResponse::build(status).json(json!({ "erro": self.public_message() }))
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::ServiceNotFound("3".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::SlotTaken {
                barber_id: 1,
                at: "2024-01-01T10:00:00Z".to_string()
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::MissingField("usuario_id".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Database("boom".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let err = AppError::Database("connection reset by peer".to_string());
        assert_eq!(err.public_message(), "Erro interno do servidor");

        let err = AppError::SlotTaken {
            barber_id: 7,
            at: "2024-06-01T09:00:00Z".to_string(),
        };
        assert!(err.public_message().contains("ocupado"));
    }

    #[test]
    fn test_error_body_uses_erro_key() {
        let err = AppError::AppointmentNotFound("42".to_string());
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
