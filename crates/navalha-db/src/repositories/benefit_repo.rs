//! Plan benefit repository
//!
//! Benefit rules are stored per plan and ordered by `ordem`; the evaluator
//! relies on that ordering for sequential compounding.

use async_trait::async_trait;
use navalha_core::{
    models::{BenefitCondition, BenefitKind, BenefitRule, NewBenefitRule},
    traits::BenefitRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, instrument};

/// Database row representation of a benefit rule
#[derive(Debug, FromRow)]
struct BenefitRuleRow {
    id: i32,
    plano_id: i32,
    tipo: String,
    servico_id: Option<i32>,
    condicao: String,
    condicao_valor: Option<i32>,
    percentual: Option<Decimal>,
    valor_fixo: Option<Decimal>,
    ordem: i32,
    ativo: bool,
}

impl TryFrom<BenefitRuleRow> for BenefitRule {
    type Error = AppError;

    fn try_from(row: BenefitRuleRow) -> Result<Self, Self::Error> {
        let kind = BenefitKind::from_str(&row.tipo).ok_or_else(|| {
            AppError::Database(format!("Unknown benefit kind '{}' on rule {}", row.tipo, row.id))
        })?;
        let condition = BenefitCondition::from_str(&row.condicao).ok_or_else(|| {
            AppError::Database(format!(
                "Unknown benefit condition '{}' on rule {}",
                row.condicao, row.id
            ))
        })?;

        Ok(BenefitRule {
            id: row.id,
            plan_id: row.plano_id,
            kind,
            service_id: row.servico_id,
            condition,
            condition_value: row.condicao_valor,
            percent_off: row.percentual,
            fixed_off: row.valor_fixo,
            position: row.ordem,
            active: row.ativo,
        })
    }
}

fn rows_to_rules(rows: Vec<BenefitRuleRow>) -> AppResult<Vec<BenefitRule>> {
    rows.into_iter().map(BenefitRule::try_from).collect()
}

/// PostgreSQL implementation of the benefit repository
pub struct PgBenefitRepository {
    pool: PgPool,
}

impl PgBenefitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BenefitRepository for PgBenefitRepository {
    #[instrument(skip(self))]
    async fn rules_for_subscription(
        &self,
        subscription_id: i32,
        service_id: i32,
    ) -> AppResult<Vec<BenefitRule>> {
        debug!(
            "Loading benefit rules for subscription {} / service {}",
            subscription_id, service_id
        );

        let rows = sqlx::query_as::<sqlx::Postgres, BenefitRuleRow>(
            r#"
            SELECT pb.id, pb.plano_id, pb.tipo, pb.servico_id, pb.condicao,
                   pb.condicao_valor, pb.percentual, pb.valor_fixo, pb.ordem, pb.ativo
            FROM plano_beneficios pb
            INNER JOIN inscricoes i ON i.plano_id = pb.plano_id
            WHERE i.id = $1
              AND pb.ativo = true
              AND (pb.servico_id IS NULL OR pb.servico_id = $2)
            ORDER BY pb.ordem ASC, pb.id ASC
            "#,
        )
        .bind(subscription_id)
        .bind(service_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error loading rules for subscription {}: {}",
                subscription_id, e
            );
            AppError::Database(format!("Failed to load benefit rules: {}", e))
        })?;

        rows_to_rules(rows)
    }

    #[instrument(skip(self))]
    async fn rules_for_plan(&self, plan_id: i32) -> AppResult<Vec<BenefitRule>> {
        debug!("Listing benefit rules for plan {}", plan_id);

        let rows = sqlx::query_as::<sqlx::Postgres, BenefitRuleRow>(
            r#"
            SELECT id, plano_id, tipo, servico_id, condicao,
                   condicao_valor, percentual, valor_fixo, ordem, ativo
            FROM plano_beneficios
            WHERE plano_id = $1 AND ativo = true
            ORDER BY ordem ASC, id ASC
            "#,
        )
        .bind(plan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing rules for plan {}: {}", plan_id, e);
            AppError::Database(format!("Failed to list benefit rules: {}", e))
        })?;

        rows_to_rules(rows)
    }

    #[instrument(skip(self, rule))]
    async fn create_rule(&self, plan_id: i32, rule: &NewBenefitRule) -> AppResult<BenefitRule> {
        debug!("Creating benefit rule for plan {}", plan_id);

        let row = sqlx::query_as::<sqlx::Postgres, BenefitRuleRow>(
            r#"
            INSERT INTO plano_beneficios
                (plano_id, tipo, servico_id, condicao, condicao_valor,
                 percentual, valor_fixo, ordem, ativo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, true)
            RETURNING id, plano_id, tipo, servico_id, condicao,
                      condicao_valor, percentual, valor_fixo, ordem, ativo
            "#,
        )
        .bind(plan_id)
        .bind(rule.kind.to_string())
        .bind(rule.service_id)
        .bind(rule.condition.to_string())
        .bind(rule.condition_value)
        .bind(rule.percent_off)
        .bind(rule.fixed_off)
        .bind(rule.position)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating rule for plan {}: {}", plan_id, e);
            AppError::Database(format!("Failed to create benefit rule: {}", e))
        })?;

        BenefitRule::try_from(row)
    }

    #[instrument(skip(self))]
    async fn usage_count(&self, subscription_id: i32) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM uso_servicos
            WHERE inscricao_id = $1
            "#,
        )
        .bind(subscription_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error counting usage for subscription {}: {}",
                subscription_id, e
            );
            AppError::Database(format!("Failed to count service usage: {}", e))
        })?;

        Ok(count.0)
    }

    #[instrument(skip(self))]
    async fn monthly_service_usage(
        &self,
        subscription_id: i32,
        service_id: i32,
        year: i32,
        month: u32,
    ) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM uso_servicos
            WHERE inscricao_id = $1
              AND servico_id = $2
              AND EXTRACT(YEAR FROM usado_em) = $3
              AND EXTRACT(MONTH FROM usado_em) = $4
            "#,
        )
        .bind(subscription_id)
        .bind(service_id)
        .bind(year)
        .bind(month as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error counting monthly usage for subscription {}: {}",
                subscription_id, e
            );
            AppError::Database(format!("Failed to count monthly usage: {}", e))
        })?;

        Ok(count.0)
    }
}
