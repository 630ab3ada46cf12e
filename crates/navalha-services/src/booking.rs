//! Booking coordinator
//!
//! Drives the booking pipeline: resolve the service and the barber,
//! check the slot, price the booking through the subscription's
//! benefits, then write appointment, payment and usage record in a
//! single transaction. The partial unique index on the appointments
//! table backs up the conflict check under concurrent requests.

use chrono::{DateTime, NaiveDate, Utc};
use navalha_core::{
    config::BillingConfig,
    models::{
        ActiveSubscription, AppliedBenefit, AppointmentListing, AppointmentStatus, BenefitOutcome,
    },
    traits::{
        AppointmentRepository, BenefitRepository, EstablishmentRepository, PaymentRepository,
        ServiceRepository, SubscriptionRepository,
    },
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::benefits::BenefitEvaluator;

/// A booking request, already deserialized and validated at the edge
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: i32,
    pub establishment_id: i32,
    pub service_id: i32,
    pub scheduled_at: DateTime<Utc>,
    pub payment_method_id: Option<i32>,
}

/// What a successful booking returns to the client
#[derive(Debug, Clone)]
pub struct BookingConfirmation {
    pub appointment_id: i32,
    pub service_name: String,
    pub base_price: Decimal,
    pub final_price: Decimal,
    pub total_discount: Decimal,
    pub applied_benefits: Vec<AppliedBenefit>,
    pub has_subscription: bool,
}

/// Booking coordinator
pub struct BookingCoordinator<S, E, U, B, A, P>
where
    S: ServiceRepository,
    E: EstablishmentRepository,
    U: SubscriptionRepository,
    B: BenefitRepository,
    A: AppointmentRepository,
    P: PaymentRepository,
{
    service_repo: Arc<S>,
    establishment_repo: Arc<E>,
    subscription_repo: Arc<U>,
    evaluator: BenefitEvaluator<B>,
    appointment_repo: Arc<A>,
    payment_repo: Arc<P>,
    pool: Arc<PgPool>,
    billing: BillingConfig,
}

impl<S, E, U, B, A, P> BookingCoordinator<S, E, U, B, A, P>
where
    S: ServiceRepository,
    E: EstablishmentRepository,
    U: SubscriptionRepository,
    B: BenefitRepository,
    A: AppointmentRepository,
    P: PaymentRepository,
{
    /// Create a new booking coordinator
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        service_repo: Arc<S>,
        establishment_repo: Arc<E>,
        subscription_repo: Arc<U>,
        benefit_repo: Arc<B>,
        appointment_repo: Arc<A>,
        payment_repo: Arc<P>,
        pool: Arc<PgPool>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            service_repo,
            establishment_repo,
            subscription_repo,
            evaluator: BenefitEvaluator::new(benefit_repo),
            appointment_repo,
            payment_repo,
            pool,
            billing,
        }
    }

    /// Book an appointment
    ///
    /// # Errors
    ///
    /// - `ServiceNotFound` / `EstablishmentNotFound` when the targets
    ///   are missing or inactive
    /// - `SlotTaken` when the barber already holds the timestamp
    /// - `Transaction` / `Database` on write failures
    #[instrument(skip(self))]
    pub async fn book(&self, req: BookingRequest) -> AppResult<BookingConfirmation> {
        info!(
            "Booking service {} for user {} at establishment {} ({})",
            req.service_id, req.user_id, req.establishment_id, req.scheduled_at
        );

        let service = self
            .service_repo
            .find_active(req.service_id)
            .await?
            .ok_or_else(|| AppError::ServiceNotFound(req.service_id.to_string()))?;

        let barber_id = self
            .establishment_repo
            .find_owner(req.establishment_id)
            .await?
            .ok_or_else(|| AppError::EstablishmentNotFound(req.establishment_id.to_string()))?;

        if self
            .appointment_repo
            .has_conflict(barber_id, req.scheduled_at, None)
            .await?
        {
            return Err(AppError::SlotTaken {
                barber_id,
                at: req.scheduled_at.to_rfc3339(),
            });
        }

        let subscription = self.current_subscription(req.user_id, req.establishment_id).await?;

        let outcome = match &subscription {
            Some(sub) => {
                self.evaluator
                    .evaluate(sub.id, req.service_id, service.base_price)
                    .await
            }
            None => BenefitOutcome::unchanged(service.base_price),
        };

        let appointment_id = self
            .persist_booking(&req, barber_id, &outcome, subscription.as_ref())
            .await?;

        info!(
            "Booked appointment {}: {} -> {} ({} off)",
            appointment_id, service.base_price, outcome.final_price, outcome.total_discount
        );

        Ok(BookingConfirmation {
            appointment_id,
            service_name: service.name,
            base_price: service.base_price,
            final_price: outcome.final_price,
            total_discount: outcome.total_discount,
            applied_benefits: outcome.applied,
            has_subscription: subscription.is_some(),
        })
    }

    /// Resolve the user's benefit-granting subscription, warning when
    /// more than one is live for the same establishment.
    async fn current_subscription(
        &self,
        user_id: i32,
        establishment_id: i32,
    ) -> AppResult<Option<ActiveSubscription>> {
        let active = self
            .subscription_repo
            .count_active(user_id, establishment_id)
            .await?;
        if active > 1 {
            warn!(
                "User {} has {} live subscriptions at establishment {}, using the most recent",
                user_id, active, establishment_id
            );
        }

        self.subscription_repo
            .find_current(user_id, establishment_id)
            .await
    }

    /// Write appointment + payment + usage record atomically
    async fn persist_booking(
        &self,
        req: &BookingRequest,
        barber_id: i32,
        outcome: &BenefitOutcome,
        subscription: Option<&ActiveSubscription>,
    ) -> AppResult<i32> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let appointment: (i32,) = sqlx::query_as(
            r#"
            INSERT INTO agendamentos
                (usuario_id, barbeiro_id, estabelecimento_id, servico_id, data_hora, status)
            VALUES ($1, $2, $3, $4, $5, 'pendente')
            RETURNING id
            "#,
        )
        .bind(req.user_id)
        .bind(barber_id)
        .bind(req.establishment_id)
        .bind(req.service_id)
        .bind(req.scheduled_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if e.as_database_error().is_some_and(|d| d.is_unique_violation()) {
                warn!(
                    "Lost slot race for barber {} at {}",
                    barber_id, req.scheduled_at
                );
                return AppError::SlotTaken {
                    barber_id,
                    at: req.scheduled_at.to_rfc3339(),
                };
            }
            error!("Failed to insert appointment: {}", e);
            AppError::Database(format!("Failed to insert appointment: {}", e))
        })?;
        let appointment_id = appointment.0;

        sqlx::query(
            r#"
            INSERT INTO pagamento
                (usuario_id, estabelecimento_id, agendamento_id, inscricao_id,
                 valor, moeda, metodo_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pendente')
            "#,
        )
        .bind(req.user_id)
        .bind(req.establishment_id)
        .bind(appointment_id)
        .bind(subscription.map(|s| s.id))
        .bind(outcome.final_price)
        .bind(&self.billing.currency)
        .bind(
            req.payment_method_id
                .unwrap_or(self.billing.default_payment_method),
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to insert payment: {}", e);
            AppError::Database(format!("Failed to insert payment: {}", e))
        })?;

        if let Some(sub) = subscription {
            let benefit_id = outcome.applied.first().map(|b| b.id);

            sqlx::query(
                r#"
                INSERT INTO uso_servicos
                    (inscricao_id, usuario_id, servico_id, agendamento_id, valor_pago, beneficio_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(sub.id)
            .bind(req.user_id)
            .bind(req.service_id)
            .bind(appointment_id)
            .bind(outcome.final_price)
            .bind(benefit_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to record service usage: {}", e);
                AppError::Database(format!("Failed to record service usage: {}", e))
            })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit booking: {}", e);
            AppError::Transaction(format!("Failed to commit booking: {}", e))
        })?;

        Ok(appointment_id)
    }

    /// Cancel an appointment on the owner's behalf
    #[instrument(skip(self))]
    pub async fn cancel(&self, appointment_id: i32, user_id: i32) -> AppResult<()> {
        let appointment = self
            .appointment_repo
            .find_owned(appointment_id, user_id)
            .await?
            .ok_or_else(|| AppError::AppointmentNotFound(appointment_id.to_string()))?;

        if !appointment.status.can_transition_to(AppointmentStatus::Cancelled) {
            return Err(AppError::Conflict(
                "Agendamento já está cancelado".to_string(),
            ));
        }

        self.appointment_repo
            .set_status(appointment_id, AppointmentStatus::Cancelled)
            .await?;

        info!("Appointment {} cancelled by user {}", appointment_id, user_id);
        Ok(())
    }

    /// Move an appointment to a new slot
    #[instrument(skip(self))]
    pub async fn reschedule(
        &self,
        appointment_id: i32,
        user_id: i32,
        new_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let appointment = self
            .appointment_repo
            .find_owned(appointment_id, user_id)
            .await?
            .ok_or_else(|| AppError::AppointmentNotFound(appointment_id.to_string()))?;

        if appointment.status == AppointmentStatus::Cancelled {
            return Err(AppError::Conflict(
                "Não é possível reagendar um agendamento cancelado".to_string(),
            ));
        }

        if self
            .appointment_repo
            .has_conflict(appointment.barber_id, new_at, Some(appointment_id))
            .await?
        {
            return Err(AppError::SlotTaken {
                barber_id: appointment.barber_id,
                at: new_at.to_rfc3339(),
            });
        }

        self.appointment_repo
            .reschedule(appointment_id, appointment.barber_id, new_at)
            .await?;

        info!("Appointment {} rescheduled to {}", appointment_id, new_at);
        Ok(())
    }

    /// Settle the appointment's payment. Payment completion is
    /// independent of the appointment's own status.
    #[instrument(skip(self))]
    pub async fn pay(&self, appointment_id: i32) -> AppResult<()> {
        let settled = self
            .payment_repo
            .complete_for_appointment(appointment_id)
            .await?;
        if !settled {
            return Err(AppError::PaymentNotFound(appointment_id.to_string()));
        }

        info!("Payment settled for appointment {}", appointment_id);
        Ok(())
    }

    /// Slot timestamps the establishment's barber holds on a day
    #[instrument(skip(self))]
    pub async fn occupied_slots(
        &self,
        establishment_id: i32,
        date: NaiveDate,
    ) -> AppResult<Vec<DateTime<Utc>>> {
        let barber_id = self
            .establishment_repo
            .find_owner(establishment_id)
            .await?
            .ok_or_else(|| AppError::EstablishmentNotFound(establishment_id.to_string()))?;

        self.appointment_repo.occupied_times(barber_id, date).await
    }

    /// A user's appointments with their latest payment
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<AppointmentListing>> {
        self.appointment_repo.list_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use navalha_core::models::{Appointment, BenefitRule, NewBenefitRule, Service};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    struct MockServiceRepo;

    #[async_trait]
    impl ServiceRepository for MockServiceRepo {
        async fn find_active(&self, id: i32) -> AppResult<Option<Service>> {
            if id == 1 {
                Ok(Some(Service {
                    id: 1,
                    name: "Corte".to_string(),
                    base_price: dec!(40.00),
                    active: true,
                }))
            } else {
                Ok(None)
            }
        }
    }

    struct MockEstablishmentRepo;

    #[async_trait]
    impl EstablishmentRepository for MockEstablishmentRepo {
        async fn find_owner(&self, id: i32) -> AppResult<Option<i32>> {
            if id == 10 {
                Ok(Some(99))
            } else {
                Ok(None)
            }
        }
    }

    struct MockSubscriptionRepo;

    #[async_trait]
    impl SubscriptionRepository for MockSubscriptionRepo {
        async fn find_current(
            &self,
            _user_id: i32,
            _establishment_id: i32,
        ) -> AppResult<Option<ActiveSubscription>> {
            Ok(None)
        }

        async fn count_active(&self, _user_id: i32, _establishment_id: i32) -> AppResult<i64> {
            Ok(0)
        }

        async fn list_for_user(
            &self,
            _user_id: i32,
        ) -> AppResult<Vec<navalha_core::models::SubscriptionSummary>> {
            Ok(vec![])
        }

        async fn cancel(&self, _id: i32, _reason: Option<&str>) -> AppResult<bool> {
            Ok(true)
        }
    }

    struct MockBenefitRepo;

    #[async_trait]
    impl BenefitRepository for MockBenefitRepo {
        async fn rules_for_subscription(
            &self,
            _subscription_id: i32,
            _service_id: i32,
        ) -> AppResult<Vec<BenefitRule>> {
            Ok(vec![])
        }

        async fn rules_for_plan(&self, _plan_id: i32) -> AppResult<Vec<BenefitRule>> {
            Ok(vec![])
        }

        async fn create_rule(
            &self,
            _plan_id: i32,
            _rule: &NewBenefitRule,
        ) -> AppResult<BenefitRule> {
            Err(AppError::Internal("not used".to_string()))
        }

        async fn usage_count(&self, _subscription_id: i32) -> AppResult<i64> {
            Ok(0)
        }

        async fn monthly_service_usage(
            &self,
            _subscription_id: i32,
            _service_id: i32,
            _year: i32,
            _month: u32,
        ) -> AppResult<i64> {
            Ok(0)
        }
    }

    struct MockAppointmentRepo {
        appointment: Option<Appointment>,
        conflict: bool,
        status_writes: Mutex<Vec<(i32, AppointmentStatus)>>,
    }

    impl MockAppointmentRepo {
        fn with(appointment: Option<Appointment>) -> Self {
            Self {
                appointment,
                conflict: false,
                status_writes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AppointmentRepository for MockAppointmentRepo {
        async fn has_conflict(
            &self,
            _barber_id: i32,
            _at: DateTime<Utc>,
            _exclude_id: Option<i32>,
        ) -> AppResult<bool> {
            Ok(self.conflict)
        }

        async fn find_owned(&self, _id: i32, _user_id: i32) -> AppResult<Option<Appointment>> {
            Ok(self.appointment.clone())
        }

        async fn set_status(&self, id: i32, status: AppointmentStatus) -> AppResult<bool> {
            self.status_writes.lock().unwrap().push((id, status));
            Ok(true)
        }

        async fn reschedule(
            &self,
            _id: i32,
            _barber_id: i32,
            _at: DateTime<Utc>,
        ) -> AppResult<bool> {
            Ok(true)
        }

        async fn occupied_times(
            &self,
            _barber_id: i32,
            _date: NaiveDate,
        ) -> AppResult<Vec<DateTime<Utc>>> {
            Ok(vec![])
        }

        async fn list_for_user(&self, _user_id: i32) -> AppResult<Vec<AppointmentListing>> {
            Ok(vec![])
        }
    }

    struct MockPaymentRepo {
        has_payment: bool,
    }

    #[async_trait]
    impl PaymentRepository for MockPaymentRepo {
        async fn complete_for_appointment(&self, _appointment_id: i32) -> AppResult<bool> {
            Ok(self.has_payment)
        }
    }

    fn pending_appointment() -> Appointment {
        Appointment {
            id: 5,
            client_id: 2,
            barber_id: 99,
            establishment_id: 10,
            scheduled_at: Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap(),
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn coordinator(
        appointments: MockAppointmentRepo,
        payments: MockPaymentRepo,
    ) -> BookingCoordinator<
        MockServiceRepo,
        MockEstablishmentRepo,
        MockSubscriptionRepo,
        MockBenefitRepo,
        MockAppointmentRepo,
        MockPaymentRepo,
    > {
        // Lazy pool: never connects unless a transaction is opened
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/navalha_test")
            .unwrap();

        BookingCoordinator::new(
            Arc::new(MockServiceRepo),
            Arc::new(MockEstablishmentRepo),
            Arc::new(MockSubscriptionRepo),
            Arc::new(MockBenefitRepo),
            Arc::new(appointments),
            Arc::new(payments),
            Arc::new(pool),
            BillingConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_booking_unknown_service_is_rejected() {
        let coord = coordinator(
            MockAppointmentRepo::with(None),
            MockPaymentRepo { has_payment: true },
        );

        let err = coord
            .book(BookingRequest {
                user_id: 2,
                establishment_id: 10,
                service_id: 999,
                scheduled_at: Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap(),
                payment_method_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ServiceNotFound(_)));
    }

    #[tokio::test]
    async fn test_booking_taken_slot_is_rejected() {
        let mut appointments = MockAppointmentRepo::with(None);
        appointments.conflict = true;
        let coord = coordinator(appointments, MockPaymentRepo { has_payment: true });

        let err = coord
            .book(BookingRequest {
                user_id: 2,
                establishment_id: 10,
                service_id: 1,
                scheduled_at: Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap(),
                payment_method_id: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SlotTaken { barber_id: 99, .. }));
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_rejected() {
        let mut appointment = pending_appointment();
        appointment.status = AppointmentStatus::Cancelled;
        let coord = coordinator(
            MockAppointmentRepo::with(Some(appointment)),
            MockPaymentRepo { has_payment: true },
        );

        let err = coord.cancel(5, 2).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancel_unowned_appointment_is_not_found() {
        let coord = coordinator(
            MockAppointmentRepo::with(None),
            MockPaymentRepo { has_payment: true },
        );

        let err = coord.cancel(5, 2).await.unwrap_err();
        assert!(matches!(err, AppError::AppointmentNotFound(_)));
    }

    #[tokio::test]
    async fn test_pay_settles_existing_payment() {
        let appointments = MockAppointmentRepo::with(Some(pending_appointment()));
        let coord = coordinator(appointments, MockPaymentRepo { has_payment: true });

        coord.pay(5).await.unwrap();
    }

    #[tokio::test]
    async fn test_pay_without_payment_row_is_not_found() {
        let coord = coordinator(
            MockAppointmentRepo::with(Some(pending_appointment())),
            MockPaymentRepo { has_payment: false },
        );

        let err = coord.pay(5).await.unwrap_err();
        assert!(matches!(err, AppError::PaymentNotFound(_)));
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_book_writes_appointment_and_payment() {
        use navalha_db::{
            PgAppointmentRepository, PgBenefitRepository, PgEstablishmentRepository,
            PgPaymentRepository, PgServiceRepository, PgSubscriptionRepository,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/navalha".to_string());
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect(&database_url)
            .await
            .unwrap();

        let (owner_id,): (i32,) = sqlx::query_as(
            "INSERT INTO usuario (nome, email) VALUES ($1, $2) RETURNING id",
        )
        .bind("Barbeiro Teste")
        .bind(format!("barbeiro+{}@teste.local", Utc::now().timestamp_nanos_opt().unwrap()))
        .fetch_one(&pool)
        .await
        .unwrap();

        let (client_id,): (i32,) = sqlx::query_as(
            "INSERT INTO usuario (nome, email) VALUES ($1, $2) RETURNING id",
        )
        .bind("Cliente Teste")
        .bind(format!("cliente+{}@teste.local", Utc::now().timestamp_nanos_opt().unwrap()))
        .fetch_one(&pool)
        .await
        .unwrap();

        let (establishment_id,): (i32,) = sqlx::query_as(
            "INSERT INTO establishments (nome, dono_id) VALUES ($1, $2) RETURNING id",
        )
        .bind("Barbearia Teste")
        .bind(owner_id)
        .fetch_one(&pool)
        .await
        .unwrap();

        let (service_id,): (i32,) = sqlx::query_as(
            "INSERT INTO servicos (nome, preco_base) VALUES ($1, $2) RETURNING id",
        )
        .bind("Corte Teste")
        .bind(dec!(40.00))
        .fetch_one(&pool)
        .await
        .unwrap();

        let pool = Arc::new(pool);
        let coord = BookingCoordinator::new(
            Arc::new(PgServiceRepository::new((*pool).clone())),
            Arc::new(PgEstablishmentRepository::new((*pool).clone())),
            Arc::new(PgSubscriptionRepository::new((*pool).clone())),
            Arc::new(PgBenefitRepository::new((*pool).clone())),
            Arc::new(PgAppointmentRepository::new((*pool).clone())),
            Arc::new(PgPaymentRepository::new((*pool).clone())),
            pool.clone(),
            BillingConfig::default(),
        );

        let confirmation = coord
            .book(BookingRequest {
                user_id: client_id,
                establishment_id,
                service_id,
                scheduled_at: Utc::now() + chrono::Duration::days(1),
                payment_method_id: None,
            })
            .await
            .unwrap();

        assert_eq!(confirmation.base_price, dec!(40.00));
        assert_eq!(confirmation.final_price, dec!(40.00));
        assert!(!confirmation.has_subscription);

        let (payment_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM pagamento WHERE agendamento_id = $1 AND status = 'pendente'",
        )
        .bind(confirmation.appointment_id)
        .fetch_one(&*pool)
        .await
        .unwrap();
        assert_eq!(payment_count, 1);
    }

    #[tokio::test]
    async fn test_reschedule_cancelled_appointment_is_rejected() {
        let mut appointment = pending_appointment();
        appointment.status = AppointmentStatus::Cancelled;
        let coord = coordinator(
            MockAppointmentRepo::with(Some(appointment)),
            MockPaymentRepo { has_payment: true },
        );

        let err = coord
            .reschedule(5, 2, Utc.with_ymd_and_hms(2024, 6, 4, 10, 0, 0).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
