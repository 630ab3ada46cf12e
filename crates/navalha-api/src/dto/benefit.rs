//! Plan benefit DTOs

use navalha_core::{
    models::{BenefitCondition, BenefitKind, BenefitRule, NewBenefitRule},
    AppError,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::dec_to_f64;

/// Payload for POST /planos/{plano_id}/beneficios
#[derive(Debug, Deserialize)]
pub struct CreateBenefitRuleRequest {
    pub tipo: String,
    pub servico_id: Option<i32>,
    pub condicao: Option<String>,
    pub condicao_valor: Option<i32>,
    pub percentual: Option<Decimal>,
    pub valor_fixo: Option<Decimal>,
    pub ordem: Option<i32>,
}

impl TryFrom<CreateBenefitRuleRequest> for NewBenefitRule {
    type Error = AppError;

    fn try_from(req: CreateBenefitRuleRequest) -> Result<Self, Self::Error> {
        let kind = BenefitKind::from_str(&req.tipo)
            .ok_or_else(|| AppError::Validation(format!("Tipo de benefício inválido: {}", req.tipo)))?;

        let condition = match req.condicao.as_deref() {
            None => BenefitCondition::Always,
            Some(label) => BenefitCondition::from_str(label).ok_or_else(|| {
                AppError::Validation(format!("Condição de benefício inválida: {}", label))
            })?,
        };

        Ok(NewBenefitRule {
            kind,
            service_id: req.servico_id,
            condition,
            condition_value: req.condicao_valor,
            percent_off: req.percentual,
            fixed_off: req.valor_fixo,
            position: req.ordem.unwrap_or(0),
        })
    }
}

/// A plan's benefit rule as the client sees it
#[derive(Debug, Serialize)]
pub struct BenefitRuleDto {
    pub id: i32,
    pub plano_id: i32,
    pub tipo: String,
    pub servico_id: Option<i32>,
    pub condicao: String,
    pub condicao_valor: Option<i32>,
    pub percentual: Option<f64>,
    pub valor_fixo: Option<f64>,
    pub ordem: i32,
    pub ativo: bool,
}

impl From<BenefitRule> for BenefitRuleDto {
    fn from(rule: BenefitRule) -> Self {
        Self {
            id: rule.id,
            plano_id: rule.plan_id,
            tipo: rule.kind.to_string(),
            servico_id: rule.service_id,
            condicao: rule.condition.to_string(),
            condicao_valor: rule.condition_value,
            percentual: rule.percent_off.map(dec_to_f64),
            valor_fixo: rule.fixed_off.map(dec_to_f64),
            ordem: rule.position,
            ativo: rule.active,
        }
    }
}
