//! Appointment repository
//!
//! Conflict detection here is the fast path; the partial unique index on
//! (barbeiro_id, data_hora) remains the authoritative guard under races.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use navalha_core::{
    models::{Appointment, AppointmentListing, AppointmentStatus},
    traits::AppointmentRepository,
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, instrument};

/// Database row representation of an appointment
#[derive(Debug, FromRow)]
struct AppointmentRow {
    id: i32,
    usuario_id: i32,
    barbeiro_id: i32,
    estabelecimento_id: i32,
    data_hora: DateTime<Utc>,
    status: String,
    criado_em: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = AppError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Database(format!(
                "Unknown appointment status '{}' on appointment {}",
                row.status, row.id
            ))
        })?;

        Ok(Appointment {
            id: row.id,
            client_id: row.usuario_id,
            barber_id: row.barbeiro_id,
            establishment_id: row.estabelecimento_id,
            scheduled_at: row.data_hora,
            status,
            created_at: row.criado_em,
        })
    }
}

/// Row for the user-facing appointment listing
#[derive(Debug, FromRow)]
struct AppointmentListingRow {
    id: i32,
    usuario_id: i32,
    estabelecimento_id: i32,
    data_hora: DateTime<Utc>,
    status: String,
    usuario_nome: Option<String>,
    estabelecimento_nome: Option<String>,
    pagamento_status: Option<String>,
    valor: Option<Decimal>,
}

impl TryFrom<AppointmentListingRow> for AppointmentListing {
    type Error = AppError;

    fn try_from(row: AppointmentListingRow) -> Result<Self, Self::Error> {
        let status = AppointmentStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Database(format!(
                "Unknown appointment status '{}' on appointment {}",
                row.status, row.id
            ))
        })?;

        Ok(AppointmentListing {
            id: row.id,
            user_id: row.usuario_id,
            establishment_id: row.estabelecimento_id,
            scheduled_at: row.data_hora,
            status,
            user_name: row.usuario_nome,
            establishment_name: row.estabelecimento_nome,
            payment_status: row.pagamento_status,
            amount: row.valor,
        })
    }
}

/// PostgreSQL implementation of the appointment repository
pub struct PgAppointmentRepository {
    pool: PgPool,
}

impl PgAppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppointmentRepository for PgAppointmentRepository {
    #[instrument(skip(self))]
    async fn has_conflict(
        &self,
        barber_id: i32,
        at: DateTime<Utc>,
        exclude_id: Option<i32>,
    ) -> AppResult<bool> {
        debug!("Checking slot conflict for barber {} at {}", barber_id, at);

        let exists: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM agendamentos
                WHERE barbeiro_id = $1
                  AND data_hora = $2
                  AND status IN ('pendente', 'confirmado')
                  AND ($3::int IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(barber_id)
        .bind(at)
        .bind(exclude_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error checking conflict for barber {}: {}", barber_id, e);
            AppError::Database(format!("Failed to check slot conflict: {}", e))
        })?;

        Ok(exists.0)
    }

    #[instrument(skip(self))]
    async fn find_owned(&self, id: i32, user_id: i32) -> AppResult<Option<Appointment>> {
        debug!("Finding appointment {} owned by user {}", id, user_id);

        let row = sqlx::query_as::<sqlx::Postgres, AppointmentRow>(
            r#"
            SELECT id, usuario_id, barbeiro_id, estabelecimento_id,
                   data_hora, status, criado_em
            FROM agendamentos
            WHERE id = $1 AND usuario_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding appointment {}: {}", id, e);
            AppError::Database(format!("Failed to find appointment: {}", e))
        })?;

        row.map(Appointment::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn set_status(&self, id: i32, status: AppointmentStatus) -> AppResult<bool> {
        debug!("Setting appointment {} status to {}", id, status);

        let result = sqlx::query(
            r#"
            UPDATE agendamentos
            SET status = $2, atualizado_em = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating appointment {}: {}", id, e);
            AppError::Database(format!("Failed to update appointment status: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn reschedule(&self, id: i32, barber_id: i32, at: DateTime<Utc>) -> AppResult<bool> {
        debug!("Rescheduling appointment {} to {}", id, at);

        let result = sqlx::query(
            r#"
            UPDATE agendamentos
            SET data_hora = $2, atualizado_em = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                return AppError::SlotTaken {
                    barber_id,
                    at: at.to_rfc3339(),
                };
            }
            error!("Database error rescheduling appointment {}: {}", id, e);
            AppError::Database(format!("Failed to reschedule appointment: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn occupied_times(
        &self,
        barber_id: i32,
        date: NaiveDate,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        debug!("Listing occupied times for barber {} on {}", barber_id, date);

        let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            SELECT data_hora
            FROM agendamentos
            WHERE barbeiro_id = $1
              AND (data_hora AT TIME ZONE 'UTC')::date = $2
              AND status IN ('pendente', 'confirmado')
            ORDER BY data_hora ASC
            "#,
        )
        .bind(barber_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing times for barber {}: {}", barber_id, e);
            AppError::Database(format!("Failed to list occupied times: {}", e))
        })?;

        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<AppointmentListing>> {
        debug!("Listing appointments for user {}", user_id);

        let rows = sqlx::query_as::<sqlx::Postgres, AppointmentListingRow>(
            r#"
            SELECT a.id, a.usuario_id, a.estabelecimento_id, a.data_hora,
                   a.status, u.nome AS usuario_nome,
                   e.nome AS estabelecimento_nome,
                   pg.status AS pagamento_status, pg.valor
            FROM agendamentos a
            LEFT JOIN usuario u ON u.id = a.usuario_id
            LEFT JOIN establishments e ON e.id = a.estabelecimento_id
            LEFT JOIN LATERAL (
                SELECT status, valor
                FROM pagamento
                WHERE agendamento_id = a.id
                ORDER BY criado_em DESC
                LIMIT 1
            ) pg ON true
            WHERE a.usuario_id = $1
            ORDER BY a.data_hora DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing appointments for user {}: {}", user_id, e);
            AppError::Database(format!("Failed to list appointments: {}", e))
        })?;

        rows.into_iter().map(AppointmentListing::try_from).collect()
    }
}
