//! Subscription lifecycle
//!
//! Enrolls users in plans and cancels their subscriptions. Billing
//! dates are calendar-aware: a cycle advances by calendar months (with
//! end-of-month clamping), never by a fixed day count. Plans with a
//! trial start in `free trial` and defer the first charge to the trial
//! end.

use chrono::{Duration, NaiveDate, Utc};
use navalha_core::{
    config::BillingConfig,
    models::{Plan, SubscriptionStatus, SubscriptionSummary},
    traits::{PlanRepository, SubscriptionRepository},
    AppError, AppResult,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// An enrollment request, deserialized at the edge
#[derive(Debug, Clone)]
pub struct EnrollmentRequest {
    pub user_id: i32,
    pub plan_id: i32,
    pub payment_method_id: Option<i32>,
}

/// What a successful enrollment returns to the client
#[derive(Debug, Clone)]
pub struct EnrollmentReceipt {
    pub subscription_id: i32,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub free_trial: bool,
    pub trial_end: Option<NaiveDate>,
    pub next_billing_date: NaiveDate,
    pub price: Decimal,
}

/// The dates and status a new enrollment starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentSchedule {
    pub status: SubscriptionStatus,
    pub next_billing_date: NaiveDate,
    pub payment_due: NaiveDate,
}

/// Compute the initial schedule for a plan enrolled on `today`.
///
/// With a trial, the first charge lands exactly at the trial end; the
/// next billing date and the payment due date coincide. Without one,
/// billing advances a full cycle and payment falls due after the
/// configured grace window.
pub fn enrollment_schedule(
    plan: &Plan,
    today: NaiveDate,
    payment_due_days: i64,
) -> EnrollmentSchedule {
    if plan.has_trial() {
        let trial_end = today + Duration::days(plan.trial_days as i64);
        EnrollmentSchedule {
            status: SubscriptionStatus::FreeTrial,
            next_billing_date: trial_end,
            payment_due: trial_end,
        }
    } else {
        EnrollmentSchedule {
            status: SubscriptionStatus::Active,
            next_billing_date: plan.cycle.advance(today),
            payment_due: today + Duration::days(payment_due_days),
        }
    }
}

/// Subscription lifecycle service
pub struct SubscriptionLifecycle<P, U>
where
    P: PlanRepository,
    U: SubscriptionRepository,
{
    plan_repo: Arc<P>,
    subscription_repo: Arc<U>,
    pool: Arc<PgPool>,
    billing: BillingConfig,
}

impl<P, U> SubscriptionLifecycle<P, U>
where
    P: PlanRepository,
    U: SubscriptionRepository,
{
    /// Create a new subscription lifecycle service
    pub fn new(
        plan_repo: Arc<P>,
        subscription_repo: Arc<U>,
        pool: Arc<PgPool>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            plan_repo,
            subscription_repo,
            pool,
            billing,
        }
    }

    /// Enroll a user in a plan
    ///
    /// # Errors
    ///
    /// - `PlanNotFound` when the plan is missing or inactive
    /// - `Transaction` / `Database` on write failures
    #[instrument(skip(self))]
    pub async fn subscribe(&self, req: EnrollmentRequest) -> AppResult<EnrollmentReceipt> {
        info!("Enrolling user {} in plan {}", req.user_id, req.plan_id);

        let plan = self
            .plan_repo
            .find_active(req.plan_id)
            .await?
            .ok_or_else(|| AppError::PlanNotFound(req.plan_id.to_string()))?;

        let already_active = self
            .subscription_repo
            .count_active(req.user_id, plan.establishment_id)
            .await?;
        if already_active > 0 {
            warn!(
                "User {} already holds {} live subscription(s) at establishment {}",
                req.user_id, already_active, plan.establishment_id
            );
        }

        let today = Utc::now().date_naive();
        let schedule = enrollment_schedule(&plan, today, self.billing.payment_due_days);

        let subscription_id = self
            .persist_enrollment(&req, &plan, today, &schedule)
            .await?;

        info!(
            "User {} enrolled: subscription {} ({}), next billing {}",
            req.user_id, subscription_id, schedule.status, schedule.next_billing_date
        );

        Ok(EnrollmentReceipt {
            subscription_id,
            plan_name: plan.name,
            status: schedule.status,
            free_trial: schedule.status == SubscriptionStatus::FreeTrial,
            trial_end: (schedule.status == SubscriptionStatus::FreeTrial)
                .then_some(schedule.next_billing_date),
            next_billing_date: schedule.next_billing_date,
            price: plan.price,
        })
    }

    /// Write subscription + first payment atomically
    async fn persist_enrollment(
        &self,
        req: &EnrollmentRequest,
        plan: &Plan,
        today: NaiveDate,
        schedule: &EnrollmentSchedule,
    ) -> AppResult<i32> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let subscription: (i32,) = sqlx::query_as(
            r#"
            INSERT INTO inscricoes
                (usuario_id, plano_id, estabelecimento_id, status,
                 data_inicio, proxima_cobranca, preco_periodo)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(req.user_id)
        .bind(plan.id)
        .bind(plan.establishment_id)
        .bind(schedule.status.to_string())
        .bind(today)
        .bind(schedule.next_billing_date)
        .bind(plan.price)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to insert subscription: {}", e);
            AppError::Database(format!("Failed to insert subscription: {}", e))
        })?;
        let subscription_id = subscription.0;

        sqlx::query(
            r#"
            INSERT INTO pagamento
                (usuario_id, estabelecimento_id, inscricao_id, valor, moeda, metodo_id, status, vencimento)
            VALUES ($1, $2, $3, $4, $5, $6, 'pendente', $7)
            "#,
        )
        .bind(req.user_id)
        .bind(plan.establishment_id)
        .bind(subscription_id)
        .bind(plan.price)
        .bind(&self.billing.currency)
        .bind(
            req.payment_method_id
                .unwrap_or(self.billing.default_payment_method),
        )
        .bind(schedule.payment_due)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to insert enrollment payment: {}", e);
            AppError::Database(format!("Failed to insert enrollment payment: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit enrollment: {}", e);
            AppError::Transaction(format!("Failed to commit enrollment: {}", e))
        })?;

        Ok(subscription_id)
    }

    /// Cancel a subscription on the user's request
    #[instrument(skip(self))]
    pub async fn cancel(&self, subscription_id: i32, reason: Option<&str>) -> AppResult<()> {
        let cancelled = self.subscription_repo.cancel(subscription_id, reason).await?;
        if !cancelled {
            return Err(AppError::SubscriptionNotFound(subscription_id.to_string()));
        }

        info!("Subscription {} cancelled", subscription_id);
        Ok(())
    }

    /// A user's non-cancelled subscriptions, newest first
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<SubscriptionSummary>> {
        self.subscription_repo.list_for_user(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navalha_core::models::BillingCycle;
    use rust_decimal_macros::dec;

    fn plan(cycle: BillingCycle, trial_days: i32) -> Plan {
        Plan {
            id: 1,
            creator_establishment_id: 10,
            establishment_id: 10,
            name: "Plano Ouro".to_string(),
            description: None,
            price: dec!(89.90),
            cycle,
            trial_days,
            is_public: true,
            active: true,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trial_defers_first_charge_to_trial_end() {
        let schedule = enrollment_schedule(&plan(BillingCycle::Monthly, 7), date(2024, 1, 1), 7);

        assert_eq!(schedule.status, SubscriptionStatus::FreeTrial);
        assert_eq!(schedule.next_billing_date, date(2024, 1, 8));
        assert_eq!(schedule.payment_due, date(2024, 1, 8));
    }

    #[test]
    fn test_monthly_enrollment_advances_one_calendar_month() {
        let schedule = enrollment_schedule(&plan(BillingCycle::Monthly, 0), date(2024, 1, 15), 7);

        assert_eq!(schedule.status, SubscriptionStatus::Active);
        assert_eq!(schedule.next_billing_date, date(2024, 2, 15));
        assert_eq!(schedule.payment_due, date(2024, 1, 22));
    }

    #[test]
    fn test_quarterly_and_annual_cycles() {
        let schedule =
            enrollment_schedule(&plan(BillingCycle::Quarterly, 0), date(2024, 1, 15), 7);
        assert_eq!(schedule.next_billing_date, date(2024, 4, 15));

        let schedule = enrollment_schedule(&plan(BillingCycle::Annual, 0), date(2024, 1, 15), 7);
        assert_eq!(schedule.next_billing_date, date(2025, 1, 15));
    }

    #[test]
    fn test_month_end_enrollment_clamps() {
        // Jan 31 + 1 month = Feb 29 in a leap year, not Mar 2
        let schedule = enrollment_schedule(&plan(BillingCycle::Monthly, 0), date(2024, 1, 31), 7);
        assert_eq!(schedule.next_billing_date, date(2024, 2, 29));
    }
}
