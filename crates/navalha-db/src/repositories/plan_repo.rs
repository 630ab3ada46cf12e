//! Plan repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use navalha_core::{
    models::{BillingCycle, Plan},
    traits::PlanRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, instrument, warn};

/// Database row representation of a plan
#[derive(Debug, FromRow)]
struct PlanRow {
    id: i32,
    criador_estabelecimento_id: i32,
    estabelecimento_id: i32,
    nome: String,
    descricao: Option<String>,
    preco: Decimal,
    ciclo: String,
    dias_teste: i32,
    publico: bool,
    ativo: bool,
    criado_em: DateTime<Utc>,
}

impl TryFrom<PlanRow> for Plan {
    type Error = AppError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let cycle = BillingCycle::from_str(&row.ciclo).ok_or_else(|| {
            AppError::Database(format!("Unknown billing cycle '{}' on plan {}", row.ciclo, row.id))
        })?;

        Ok(Plan {
            id: row.id,
            creator_establishment_id: row.criador_estabelecimento_id,
            establishment_id: row.estabelecimento_id,
            name: row.nome,
            description: row.descricao,
            price: row.preco,
            cycle,
            trial_days: row.dias_teste,
            is_public: row.publico,
            active: row.ativo,
            created_at: row.criado_em,
        })
    }
}

/// PostgreSQL implementation of the plan repository
pub struct PgPlanRepository {
    pool: PgPool,
}

impl PgPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanRepository for PgPlanRepository {
    #[instrument(skip(self))]
    async fn find_active(&self, id: i32) -> AppResult<Option<Plan>> {
        debug!("Finding active plan by id: {}", id);

        let row = sqlx::query_as::<sqlx::Postgres, PlanRow>(
            r#"
            SELECT id, criador_estabelecimento_id, estabelecimento_id, nome,
                   descricao, preco, ciclo, dias_teste, publico, ativo, criado_em
            FROM planos
            WHERE id = $1 AND ativo = true
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding plan {}: {}", id, e);
            AppError::Database(format!("Failed to find plan: {}", e))
        })?;

        match row {
            Some(row) => match Plan::try_from(row) {
                Ok(plan) => Ok(Some(plan)),
                Err(e) => {
                    warn!("Rejecting plan {} with invalid data: {}", id, e);
                    Err(e)
                }
            },
            None => Ok(None),
        }
    }
}
