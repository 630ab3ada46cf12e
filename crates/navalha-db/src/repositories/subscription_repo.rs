//! Subscription repository

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use navalha_core::{
    models::{ActiveSubscription, SubscriptionStatus, SubscriptionSummary},
    traits::SubscriptionRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, instrument};

/// Row for the benefit-granting subscription lookup
#[derive(Debug, FromRow)]
struct CurrentSubscriptionRow {
    id: i32,
    plano_id: i32,
    plano_nome: String,
}

impl From<CurrentSubscriptionRow> for ActiveSubscription {
    fn from(row: CurrentSubscriptionRow) -> Self {
        ActiveSubscription {
            id: row.id,
            plan_id: row.plano_id,
            plan_name: row.plano_nome,
        }
    }
}

/// Row for the user-facing subscription listing. The plan and
/// establishment joins are LEFT JOINs, so those columns are nullable.
#[derive(Debug, FromRow)]
struct SubscriptionSummaryRow {
    id: i32,
    status: String,
    data_inicio: NaiveDate,
    proxima_cobranca: NaiveDate,
    preco_periodo: Decimal,
    plano_nome: Option<String>,
    plano_descricao: Option<String>,
    ciclo: Option<String>,
    estabelecimento_id: Option<i32>,
    estabelecimento_nome: Option<String>,
    criado_em: DateTime<Utc>,
}

impl TryFrom<SubscriptionSummaryRow> for SubscriptionSummary {
    type Error = AppError;

    fn try_from(row: SubscriptionSummaryRow) -> Result<Self, Self::Error> {
        let status = SubscriptionStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Database(format!(
                "Unknown subscription status '{}' on subscription {}",
                row.status, row.id
            ))
        })?;

        Ok(SubscriptionSummary {
            id: row.id,
            status,
            start_date: row.data_inicio,
            next_billing_date: row.proxima_cobranca,
            current_period_price: row.preco_periodo,
            plan_name: row.plano_nome,
            plan_description: row.plano_descricao,
            cycle: row.ciclo,
            establishment_id: row.estabelecimento_id,
            establishment_name: row.estabelecimento_nome,
            created_at: row.criado_em,
        })
    }
}

/// PostgreSQL implementation of the subscription repository
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    #[instrument(skip(self))]
    async fn find_current(
        &self,
        user_id: i32,
        establishment_id: i32,
    ) -> AppResult<Option<ActiveSubscription>> {
        debug!(
            "Finding current subscription for user {} at establishment {}",
            user_id, establishment_id
        );

        let row = sqlx::query_as::<sqlx::Postgres, CurrentSubscriptionRow>(
            r#"
            SELECT i.id, i.plano_id, p.nome AS plano_nome
            FROM inscricoes i
            INNER JOIN planos p ON p.id = i.plano_id
            WHERE i.usuario_id = $1
              AND i.estabelecimento_id = $2
              AND i.status IN ('ativo', 'free trial')
            ORDER BY i.criado_em DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(establishment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding subscription for user {}: {}", user_id, e);
            AppError::Database(format!("Failed to find subscription: {}", e))
        })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn count_active(&self, user_id: i32, establishment_id: i32) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM inscricoes
            WHERE usuario_id = $1
              AND estabelecimento_id = $2
              AND status IN ('ativo', 'free trial')
            "#,
        )
        .bind(user_id)
        .bind(establishment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error counting subscriptions for user {}: {}", user_id, e);
            AppError::Database(format!("Failed to count subscriptions: {}", e))
        })?;

        Ok(count.0)
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<SubscriptionSummary>> {
        debug!("Listing subscriptions for user {}", user_id);

        let rows = sqlx::query_as::<sqlx::Postgres, SubscriptionSummaryRow>(
            r#"
            SELECT i.id, i.status, i.data_inicio, i.proxima_cobranca,
                   i.preco_periodo, p.nome AS plano_nome,
                   p.descricao AS plano_descricao, p.ciclo,
                   e.id AS estabelecimento_id, e.nome AS estabelecimento_nome,
                   i.criado_em
            FROM inscricoes i
            LEFT JOIN planos p ON p.id = i.plano_id
            LEFT JOIN establishments e ON e.id = i.estabelecimento_id
            WHERE i.usuario_id = $1
              AND i.status <> 'cancelado'
            ORDER BY i.criado_em DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing subscriptions for user {}: {}", user_id, e);
            AppError::Database(format!("Failed to list subscriptions: {}", e))
        })?;

        rows.into_iter().map(SubscriptionSummary::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn cancel(&self, id: i32, reason: Option<&str>) -> AppResult<bool> {
        debug!("Cancelling subscription {}", id);

        let result = sqlx::query(
            r#"
            UPDATE inscricoes
            SET status = 'cancelado',
                cancelado_por_user = true,
                motivo_cancelamento = $2,
                atualizado_em = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error cancelling subscription {}: {}", id, e);
            AppError::Database(format!("Failed to cancel subscription: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }
}
