//! Establishment repository
//!
//! The booking engine only needs the owner (barber) resolution;
//! establishment CRUD lives outside the core.

use async_trait::async_trait;
use navalha_core::{traits::EstablishmentRepository, AppError, AppResult};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of establishment lookups
pub struct PgEstablishmentRepository {
    pool: PgPool,
}

impl PgEstablishmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EstablishmentRepository for PgEstablishmentRepository {
    #[instrument(skip(self))]
    async fn find_owner(&self, id: i32) -> AppResult<Option<i32>> {
        debug!("Resolving owner of establishment {}", id);

        let result: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT dono_id
            FROM establishments
            WHERE id = $1 AND deletado_em IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error resolving establishment {}: {}", id, e);
            AppError::Database(format!("Failed to resolve establishment owner: {}", e))
        })?;

        Ok(result.map(|r| r.0))
    }
}
