//! Subscription DTOs

use chrono::{DateTime, NaiveDate, Utc};
use navalha_core::models::SubscriptionSummary;
use navalha_services::{EnrollmentReceipt, EnrollmentRequest};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::dec_to_f64;

/// Payload for POST /inscricoes
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubscriptionRequest {
    #[validate(range(min = 1))]
    pub usuario_id: i32,

    #[validate(range(min = 1))]
    pub plano_id: i32,

    pub pagamento_metodo_id: Option<i32>,
}

impl From<CreateSubscriptionRequest> for EnrollmentRequest {
    fn from(req: CreateSubscriptionRequest) -> Self {
        EnrollmentRequest {
            user_id: req.usuario_id,
            plan_id: req.plano_id,
            payment_method_id: req.pagamento_metodo_id,
        }
    }
}

/// Response body for a successful enrollment
#[derive(Debug, Serialize)]
pub struct SubscriptionCreatedResponse {
    pub mensagem: String,
    pub id: i32,
    pub plano: String,
    pub status: String,
    pub free_trial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fim_teste: Option<NaiveDate>,
    pub proxima_cobranca: NaiveDate,
    pub valor: f64,
}

impl From<EnrollmentReceipt> for SubscriptionCreatedResponse {
    fn from(receipt: EnrollmentReceipt) -> Self {
        Self {
            mensagem: "Inscrição realizada com sucesso".to_string(),
            id: receipt.subscription_id,
            plano: receipt.plan_name,
            status: receipt.status.to_string(),
            free_trial: receipt.free_trial,
            fim_teste: receipt.trial_end,
            proxima_cobranca: receipt.next_billing_date,
            valor: dec_to_f64(receipt.price),
        }
    }
}

/// Payload for PATCH /inscricoes/{id}/cancelar
#[derive(Debug, Deserialize)]
pub struct CancelSubscriptionRequest {
    pub motivo: Option<String>,
}

/// One row of a user's subscription list
#[derive(Debug, Serialize)]
pub struct SubscriptionSummaryDto {
    pub id: i32,
    pub status: String,
    pub data_inicio: NaiveDate,
    pub proxima_cobranca: NaiveDate,
    pub preco_periodo: f64,
    pub plano_nome: Option<String>,
    pub plano_descricao: Option<String>,
    pub ciclo: Option<String>,
    pub estabelecimento_id: Option<i32>,
    pub estabelecimento_nome: Option<String>,
    pub criado_em: DateTime<Utc>,
}

impl From<SubscriptionSummary> for SubscriptionSummaryDto {
    fn from(s: SubscriptionSummary) -> Self {
        Self {
            id: s.id,
            status: s.status.to_string(),
            data_inicio: s.start_date,
            proxima_cobranca: s.next_billing_date,
            preco_periodo: dec_to_f64(s.current_period_price),
            plano_nome: s.plan_name,
            plano_descricao: s.plan_description,
            ciclo: s.cycle,
            estabelecimento_id: s.establishment_id,
            estabelecimento_nome: s.establishment_name,
            criado_em: s.created_at,
        }
    }
}
