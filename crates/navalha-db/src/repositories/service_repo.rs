//! Service catalog repository

use async_trait::async_trait;
use navalha_core::{models::Service, traits::ServiceRepository, AppError, AppResult};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, instrument};

/// Database row representation of a service
#[derive(Debug, FromRow)]
struct ServiceRow {
    id: i32,
    nome: String,
    preco_base: Decimal,
    ativo: bool,
}

impl From<ServiceRow> for Service {
    fn from(row: ServiceRow) -> Self {
        Service {
            id: row.id,
            name: row.nome,
            base_price: row.preco_base,
            active: row.ativo,
        }
    }
}

/// PostgreSQL implementation of the service catalog
pub struct PgServiceRepository {
    pool: PgPool,
}

impl PgServiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceRepository for PgServiceRepository {
    #[instrument(skip(self))]
    async fn find_active(&self, id: i32) -> AppResult<Option<Service>> {
        debug!("Finding active service by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, ServiceRow>(
            r#"
            SELECT id, nome, preco_base, ativo
            FROM servicos
            WHERE id = $1 AND ativo = true
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding service {}: {}", id, e);
            AppError::Database(format!("Failed to find service: {}", e))
        })?;

        Ok(result.map(Into::into))
    }
}
