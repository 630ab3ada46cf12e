//! Payment repository

use async_trait::async_trait;
use navalha_core::{traits::PaymentRepository, AppError, AppResult};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of payment status writes
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    #[instrument(skip(self))]
    async fn complete_for_appointment(&self, appointment_id: i32) -> AppResult<bool> {
        debug!("Completing payment for appointment {}", appointment_id);

        let result = sqlx::query(
            r#"
            UPDATE pagamento
            SET status = 'completo', pago_em = NOW(), atualizado_em = NOW()
            WHERE agendamento_id = $1
            "#,
        )
        .bind(appointment_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(
                "Database error completing payment for appointment {}: {}",
                appointment_id, e
            );
            AppError::Database(format!("Failed to complete payment: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }
}
