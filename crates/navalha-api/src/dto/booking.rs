//! Appointment DTOs

use chrono::{DateTime, NaiveDate, Utc};
use navalha_core::models::AppointmentListing;
use navalha_services::{BookingConfirmation, BookingRequest};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::dec_to_f64;

/// Payload for POST /agendamentos
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    #[validate(range(min = 1))]
    pub usuario_id: i32,

    #[validate(range(min = 1))]
    pub estabelecimento_id: i32,

    #[validate(range(min = 1))]
    pub servico_id: i32,

    /// Slot timestamp; the wire name is legacy
    pub proximo_pag: DateTime<Utc>,

    pub metodo_pagamento: Option<i32>,
}

impl From<CreateAppointmentRequest> for BookingRequest {
    fn from(req: CreateAppointmentRequest) -> Self {
        BookingRequest {
            user_id: req.usuario_id,
            establishment_id: req.estabelecimento_id,
            service_id: req.servico_id,
            scheduled_at: req.proximo_pag,
            payment_method_id: req.metodo_pagamento,
        }
    }
}

/// A benefit that fired during booking, as the client sees it
#[derive(Debug, Serialize)]
pub struct AppliedBenefitDto {
    pub id: i32,
    pub tipo: String,
    pub condicao: String,
    pub desconto: f64,
    pub descricao: String,
}

/// Response body for a successful booking
#[derive(Debug, Serialize)]
pub struct AppointmentCreatedResponse {
    pub mensagem: String,
    pub id: i32,
    pub servico: String,
    pub valor_original: f64,
    pub valor_final: f64,
    pub desconto_total: f64,
    pub beneficios_aplicados: Vec<AppliedBenefitDto>,
    pub tem_assinatura: bool,
}

impl From<BookingConfirmation> for AppointmentCreatedResponse {
    fn from(conf: BookingConfirmation) -> Self {
        Self {
            mensagem: "Agendamento criado com sucesso".to_string(),
            id: conf.appointment_id,
            servico: conf.service_name,
            valor_original: dec_to_f64(conf.base_price),
            valor_final: dec_to_f64(conf.final_price),
            desconto_total: dec_to_f64(conf.total_discount),
            beneficios_aplicados: conf
                .applied_benefits
                .into_iter()
                .map(|b| AppliedBenefitDto {
                    id: b.id,
                    tipo: b.kind.to_string(),
                    condicao: b.condition.to_string(),
                    desconto: dec_to_f64(b.discount),
                    descricao: b.description,
                })
                .collect(),
            tem_assinatura: conf.has_subscription,
        }
    }
}

/// Query parameters for GET /agendamentos
#[derive(Debug, Deserialize)]
pub struct AppointmentListQuery {
    pub usuario_id: i32,
}

/// One row of a user's appointment list
#[derive(Debug, Serialize)]
pub struct AppointmentListingDto {
    pub id: i32,
    pub usuario_id: i32,
    pub estabelecimento_id: i32,
    pub data_hora: DateTime<Utc>,
    pub status: String,
    pub usuario_nome: Option<String>,
    pub estabelecimento_nome: Option<String>,
    pub pagamento_status: Option<String>,
    pub valor: Option<f64>,
}

impl From<AppointmentListing> for AppointmentListingDto {
    fn from(a: AppointmentListing) -> Self {
        Self {
            id: a.id,
            usuario_id: a.user_id,
            estabelecimento_id: a.establishment_id,
            data_hora: a.scheduled_at,
            status: a.status.to_string(),
            usuario_nome: a.user_name,
            estabelecimento_nome: a.establishment_name,
            pagamento_status: a.payment_status,
            valor: a.amount.map(dec_to_f64),
        }
    }
}

/// Payload for PATCH /agendamentos/{id}/cancelar
#[derive(Debug, Deserialize, Validate)]
pub struct AppointmentActionRequest {
    #[validate(range(min = 1))]
    pub usuario_id: i32,
}

/// Payload for PATCH /agendamentos/{id}/reagendar
#[derive(Debug, Deserialize, Validate)]
pub struct RescheduleRequest {
    #[validate(range(min = 1))]
    pub usuario_id: i32,

    pub nova_data: DateTime<Utc>,
}

/// Query parameters for GET /agendamentos/horarios-disponiveis/{id}
#[derive(Debug, Deserialize)]
pub struct OccupiedSlotsQuery {
    pub data: NaiveDate,
}

/// Response body listing a barber's taken slots on a day
#[derive(Debug, Serialize)]
pub struct OccupiedSlotsResponse {
    #[serde(rename = "horariosOcupados")]
    pub occupied: Vec<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_create_request_parses_portuguese_fields() {
        let body = r#"{
            "usuario_id": 2,
            "estabelecimento_id": 10,
            "servico_id": 1,
            "proximo_pag": "2024-06-03T10:00:00Z"
        }"#;

        let req: CreateAppointmentRequest = serde_json::from_str(body).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.usuario_id, 2);
        assert!(req.metodo_pagamento.is_none());
    }

    #[test]
    fn test_created_response_keeps_wire_names() {
        let conf = BookingConfirmation {
            appointment_id: 7,
            service_name: "Corte".to_string(),
            base_price: dec!(40.00),
            final_price: dec!(31.00),
            total_discount: dec!(9.00),
            applied_benefits: vec![],
            has_subscription: true,
        };

        let json = serde_json::to_value(AppointmentCreatedResponse::from(conf)).unwrap();
        assert_eq!(json["valor_original"], 40.0);
        assert_eq!(json["valor_final"], 31.0);
        assert_eq!(json["desconto_total"], 9.0);
        assert_eq!(json["tem_assinatura"], true);
        assert!(json["beneficios_aplicados"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_occupied_slots_response_uses_camel_case_key() {
        let resp = OccupiedSlotsResponse { occupied: vec![] };
        let json = serde_json::to_value(resp).unwrap();
        assert!(json.get("horariosOcupados").is_some());
    }
}
