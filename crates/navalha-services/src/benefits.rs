//! Benefit evaluator
//!
//! Evaluates a subscription's discount rules against a service price.
//! Rules run in ascending position order and compound sequentially on
//! the running price; the result never goes below zero. Evaluation is
//! fail-soft: any repository error degrades to the undiscounted price
//! so a broken rule set can never block a booking.

use chrono::{DateTime, Datelike, Utc};
use navalha_core::{
    models::{AppliedBenefit, BenefitCondition, BenefitKind, BenefitOutcome, BenefitRule},
    traits::BenefitRepository,
    AppResult,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Benefit evaluator
pub struct BenefitEvaluator<B: BenefitRepository> {
    benefit_repo: Arc<B>,
}

impl<B: BenefitRepository> BenefitEvaluator<B> {
    /// Create a new benefit evaluator
    pub fn new(benefit_repo: Arc<B>) -> Self {
        Self { benefit_repo }
    }

    /// Evaluate the subscription's rules against a base price.
    ///
    /// Never fails: repository errors are logged and the base price is
    /// returned untouched.
    #[instrument(skip(self))]
    pub async fn evaluate(
        &self,
        subscription_id: i32,
        service_id: i32,
        base_price: Decimal,
    ) -> BenefitOutcome {
        match self
            .evaluate_at(subscription_id, service_id, base_price, Utc::now())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    "Benefit evaluation failed for subscription {}, charging full price: {}",
                    subscription_id, e
                );
                BenefitOutcome::unchanged(base_price)
            }
        }
    }

    /// Evaluation against an explicit clock, used by `evaluate` and by
    /// the date-sensitive tests.
    pub(crate) async fn evaluate_at(
        &self,
        subscription_id: i32,
        service_id: i32,
        base_price: Decimal,
        now: DateTime<Utc>,
    ) -> AppResult<BenefitOutcome> {
        let rules = self
            .benefit_repo
            .rules_for_subscription(subscription_id, service_id)
            .await?;

        if rules.is_empty() {
            debug!("No benefit rules for subscription {}", subscription_id);
            return Ok(BenefitOutcome::unchanged(base_price));
        }

        let mut running = base_price;
        let mut applied = Vec::new();

        for rule in &rules {
            if !self
                .condition_holds(rule, subscription_id, service_id, now)
                .await?
            {
                continue;
            }

            let discount = Self::discount_for(rule, running);
            if discount <= Decimal::ZERO {
                continue;
            }

            running -= discount;
            if running < Decimal::ZERO {
                running = Decimal::ZERO;
            }

            debug!(
                "Rule {} applied: -{} (running price now {})",
                rule.id, discount, running
            );

            applied.push(AppliedBenefit {
                id: rule.id,
                kind: rule.kind,
                condition: rule.condition,
                discount,
                description: Self::describe(rule),
            });
        }

        Ok(BenefitOutcome {
            final_price: running,
            total_discount: base_price - running,
            applied,
        })
    }

    /// Whether a rule's condition holds for this booking
    async fn condition_holds(
        &self,
        rule: &BenefitRule,
        subscription_id: i32,
        service_id: i32,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        match rule.condition {
            BenefitCondition::Always => Ok(true),

            BenefitCondition::FirstUse => {
                let used = self.benefit_repo.usage_count(subscription_id).await?;
                Ok(used == 0)
            }

            BenefitCondition::AfterNUses => {
                let n = match rule.condition_value {
                    Some(n) if n > 0 => n as i64,
                    _ => return Ok(false),
                };
                let this_month = self
                    .benefit_repo
                    .monthly_service_usage(subscription_id, service_id, now.year(), now.month())
                    .await?;
                // The booking being priced counts as use number this_month + 1
                Ok((this_month + 1) % n == 0)
            }

            BenefitCondition::Weekday => {
                let target = match rule.condition_value {
                    Some(d @ 0..=6) => d as u32,
                    _ => return Ok(false),
                };
                Ok(now.weekday().num_days_from_sunday() == target)
            }
        }
    }

    /// Discount a rule grants on the running price
    fn discount_for(rule: &BenefitRule, running: Decimal) -> Decimal {
        match rule.kind {
            BenefitKind::PercentDiscount => {
                let percent = rule.percent_off.unwrap_or(Decimal::ZERO);
                (running * percent / Decimal::from(100)).round_dp(2)
            }
            BenefitKind::FixedDiscount => {
                let fixed = rule.fixed_off.unwrap_or(Decimal::ZERO);
                fixed.min(running)
            }
        }
    }

    /// Human description of a rule, in the API's language
    fn describe(rule: &BenefitRule) -> String {
        let condition = match rule.condition {
            BenefitCondition::Always => "Benefício permanente".to_string(),
            BenefitCondition::FirstUse => "Desconto de primeira vez".to_string(),
            BenefitCondition::AfterNUses => {
                format!("Após {} usos", rule.condition_value.unwrap_or(0))
            }
            BenefitCondition::Weekday => {
                let day = match rule.condition_value {
                    Some(0) => "Domingo",
                    Some(1) => "Segunda-feira",
                    Some(2) => "Terça-feira",
                    Some(3) => "Quarta-feira",
                    Some(4) => "Quinta-feira",
                    Some(5) => "Sexta-feira",
                    Some(6) => "Sábado",
                    _ => "dia inválido",
                };
                format!("Desconto de {}", day)
            }
        };

        match rule.kind {
            BenefitKind::PercentDiscount => format!(
                "{} - {}% OFF",
                condition,
                rule.percent_off.unwrap_or(Decimal::ZERO).normalize()
            ),
            BenefitKind::FixedDiscount => format!(
                "{} - R$ {} OFF",
                condition,
                rule.fixed_off.unwrap_or(Decimal::ZERO)
            ),
        }
    }
}

/// Plan benefit administration: list a plan's rules and attach new ones
pub struct PlanBenefitsService<P, B>
where
    P: navalha_core::traits::PlanRepository,
    B: BenefitRepository,
{
    plan_repo: Arc<P>,
    benefit_repo: Arc<B>,
}

impl<P, B> PlanBenefitsService<P, B>
where
    P: navalha_core::traits::PlanRepository,
    B: BenefitRepository,
{
    pub fn new(plan_repo: Arc<P>, benefit_repo: Arc<B>) -> Self {
        Self {
            plan_repo,
            benefit_repo,
        }
    }

    /// Active rules of a plan in evaluation order
    #[instrument(skip(self))]
    pub async fn list(&self, plan_id: i32) -> AppResult<Vec<BenefitRule>> {
        self.plan_repo
            .find_active(plan_id)
            .await?
            .ok_or_else(|| navalha_core::AppError::PlanNotFound(plan_id.to_string()))?;

        self.benefit_repo.rules_for_plan(plan_id).await
    }

    /// Validate and attach a new rule to a plan
    #[instrument(skip(self, rule))]
    pub async fn add_rule(
        &self,
        plan_id: i32,
        rule: navalha_core::models::NewBenefitRule,
    ) -> AppResult<BenefitRule> {
        use navalha_core::AppError;

        self.plan_repo
            .find_active(plan_id)
            .await?
            .ok_or_else(|| AppError::PlanNotFound(plan_id.to_string()))?;

        match rule.kind {
            BenefitKind::PercentDiscount => {
                let percent = rule
                    .percent_off
                    .ok_or_else(|| AppError::MissingField("percentual".to_string()))?;
                if percent <= Decimal::ZERO || percent > Decimal::from(100) {
                    return Err(AppError::Validation(
                        "Percentual de desconto deve estar entre 0 e 100".to_string(),
                    ));
                }
            }
            BenefitKind::FixedDiscount => {
                let fixed = rule
                    .fixed_off
                    .ok_or_else(|| AppError::MissingField("valor_fixo".to_string()))?;
                if fixed <= Decimal::ZERO {
                    return Err(AppError::Validation(
                        "Valor fixo de desconto deve ser positivo".to_string(),
                    ));
                }
            }
        }

        match rule.condition {
            BenefitCondition::AfterNUses => {
                if !matches!(rule.condition_value, Some(n) if n >= 1) {
                    return Err(AppError::Validation(
                        "Condição apos_x_usos exige um número de usos".to_string(),
                    ));
                }
            }
            BenefitCondition::Weekday => {
                if !matches!(rule.condition_value, Some(0..=6)) {
                    return Err(AppError::Validation(
                        "Condição dia_semana exige um dia entre 0 (Domingo) e 6 (Sábado)"
                            .to_string(),
                    ));
                }
            }
            _ => {}
        }

        self.benefit_repo.create_rule(plan_id, &rule).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use navalha_core::models::NewBenefitRule;
    use navalha_core::AppError;
    use rust_decimal_macros::dec;

    struct MockBenefitRepository {
        rules: Vec<BenefitRule>,
        total_usage: i64,
        monthly_usage: i64,
        fail: bool,
    }

    impl MockBenefitRepository {
        fn with_rules(rules: Vec<BenefitRule>) -> Self {
            Self {
                rules,
                total_usage: 0,
                monthly_usage: 0,
                fail: false,
            }
        }
    }

    #[async_trait]
    impl BenefitRepository for MockBenefitRepository {
        async fn rules_for_subscription(
            &self,
            _subscription_id: i32,
            _service_id: i32,
        ) -> AppResult<Vec<BenefitRule>> {
            if self.fail {
                return Err(AppError::Database("boom".to_string()));
            }
            Ok(self.rules.clone())
        }

        async fn rules_for_plan(&self, _plan_id: i32) -> AppResult<Vec<BenefitRule>> {
            Ok(self.rules.clone())
        }

        async fn create_rule(
            &self,
            _plan_id: i32,
            _rule: &NewBenefitRule,
        ) -> AppResult<BenefitRule> {
            Err(AppError::Internal("not used".to_string()))
        }

        async fn usage_count(&self, _subscription_id: i32) -> AppResult<i64> {
            Ok(self.total_usage)
        }

        async fn monthly_service_usage(
            &self,
            _subscription_id: i32,
            _service_id: i32,
            _year: i32,
            _month: u32,
        ) -> AppResult<i64> {
            Ok(self.monthly_usage)
        }
    }

    fn percent_rule(id: i32, percent: Decimal, position: i32) -> BenefitRule {
        BenefitRule {
            id,
            plan_id: 1,
            kind: BenefitKind::PercentDiscount,
            service_id: None,
            condition: BenefitCondition::Always,
            condition_value: None,
            percent_off: Some(percent),
            fixed_off: None,
            position,
            active: true,
        }
    }

    fn fixed_rule(id: i32, fixed: Decimal, position: i32) -> BenefitRule {
        BenefitRule {
            id,
            plan_id: 1,
            kind: BenefitKind::FixedDiscount,
            service_id: None,
            condition: BenefitCondition::Always,
            condition_value: None,
            percent_off: None,
            fixed_off: Some(fixed),
            position,
            active: true,
        }
    }

    fn evaluator(repo: MockBenefitRepository) -> BenefitEvaluator<MockBenefitRepository> {
        BenefitEvaluator::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_discounts_compound_sequentially() {
        // 10% off 40.00 leaves 36.00, then 5.00 off leaves 31.00
        let repo = MockBenefitRepository::with_rules(vec![
            percent_rule(1, dec!(10), 0),
            fixed_rule(2, dec!(5.00), 1),
        ]);

        let outcome = evaluator(repo).evaluate(1, 1, dec!(40.00)).await;

        assert_eq!(outcome.final_price, dec!(31.00));
        assert_eq!(outcome.total_discount, dec!(9.00));
        assert_eq!(outcome.applied.len(), 2);
        assert_eq!(outcome.applied[0].discount, dec!(4.00));
        assert_eq!(outcome.applied[1].discount, dec!(5.00));
    }

    #[tokio::test]
    async fn test_fixed_discount_never_exceeds_running_price() {
        let repo = MockBenefitRepository::with_rules(vec![fixed_rule(1, dec!(100.00), 0)]);

        let outcome = evaluator(repo).evaluate(1, 1, dec!(25.00)).await;

        assert_eq!(outcome.final_price, Decimal::ZERO);
        assert_eq!(outcome.total_discount, dec!(25.00));
    }

    #[tokio::test]
    async fn test_first_use_only_applies_with_zero_usage() {
        let rule = BenefitRule {
            condition: BenefitCondition::FirstUse,
            ..percent_rule(1, dec!(50), 0)
        };

        let mut repo = MockBenefitRepository::with_rules(vec![rule.clone()]);
        repo.total_usage = 0;
        let outcome = evaluator(repo).evaluate(1, 1, dec!(40.00)).await;
        assert_eq!(outcome.final_price, dec!(20.00));

        let mut repo = MockBenefitRepository::with_rules(vec![rule]);
        repo.total_usage = 3;
        let outcome = evaluator(repo).evaluate(1, 1, dec!(40.00)).await;
        assert_eq!(outcome.final_price, dec!(40.00));
        assert!(outcome.applied.is_empty());
    }

    #[tokio::test]
    async fn test_after_n_uses_counts_the_current_booking() {
        let rule = BenefitRule {
            condition: BenefitCondition::AfterNUses,
            condition_value: Some(3),
            ..percent_rule(1, dec!(100), 0)
        };

        // 2 prior uses this month: this booking is the 3rd, rule fires
        let mut repo = MockBenefitRepository::with_rules(vec![rule.clone()]);
        repo.monthly_usage = 2;
        let outcome = evaluator(repo).evaluate(1, 1, dec!(40.00)).await;
        assert_eq!(outcome.final_price, Decimal::ZERO);

        // 3 prior uses: this booking is the 4th, rule stays quiet
        let mut repo = MockBenefitRepository::with_rules(vec![rule]);
        repo.monthly_usage = 3;
        let outcome = evaluator(repo).evaluate(1, 1, dec!(40.00)).await;
        assert_eq!(outcome.final_price, dec!(40.00));
    }

    #[tokio::test]
    async fn test_weekday_condition_uses_sunday_zero_indexing() {
        let rule = BenefitRule {
            condition: BenefitCondition::Weekday,
            condition_value: Some(1), // Monday
            ..percent_rule(1, dec!(20), 0)
        };
        let repo = MockBenefitRepository::with_rules(vec![rule]);
        let eval = evaluator(repo);

        // 2024-06-03 is a Monday
        let monday = Utc.with_ymd_and_hms(2024, 6, 3, 10, 0, 0).unwrap();
        let outcome = eval.evaluate_at(1, 1, dec!(40.00), monday).await.unwrap();
        assert_eq!(outcome.final_price, dec!(32.00));

        // 2024-06-04 is a Tuesday
        let tuesday = Utc.with_ymd_and_hms(2024, 6, 4, 10, 0, 0).unwrap();
        let outcome = eval.evaluate_at(1, 1, dec!(40.00), tuesday).await.unwrap();
        assert_eq!(outcome.final_price, dec!(40.00));
    }

    #[tokio::test]
    async fn test_after_n_uses_without_value_never_fires() {
        let rule = BenefitRule {
            condition: BenefitCondition::AfterNUses,
            condition_value: None,
            ..percent_rule(1, dec!(50), 0)
        };
        let repo = MockBenefitRepository::with_rules(vec![rule]);

        let outcome = evaluator(repo).evaluate(1, 1, dec!(40.00)).await;
        assert_eq!(outcome.final_price, dec!(40.00));
    }

    #[tokio::test]
    async fn test_repository_failure_degrades_to_full_price() {
        let mut repo = MockBenefitRepository::with_rules(vec![percent_rule(1, dec!(50), 0)]);
        repo.fail = true;

        let outcome = evaluator(repo).evaluate(1, 1, dec!(40.00)).await;

        assert_eq!(outcome.final_price, dec!(40.00));
        assert_eq!(outcome.total_discount, Decimal::ZERO);
        assert!(outcome.applied.is_empty());
    }

    struct MockPlanRepository {
        plan: Option<navalha_core::models::Plan>,
    }

    #[async_trait]
    impl navalha_core::traits::PlanRepository for MockPlanRepository {
        async fn find_active(&self, _id: i32) -> AppResult<Option<navalha_core::models::Plan>> {
            Ok(self.plan.clone())
        }
    }

    fn some_plan() -> navalha_core::models::Plan {
        navalha_core::models::Plan {
            id: 1,
            creator_establishment_id: 10,
            establishment_id: 10,
            name: "Plano Ouro".to_string(),
            description: None,
            price: dec!(89.90),
            cycle: navalha_core::models::BillingCycle::Monthly,
            trial_days: 0,
            is_public: true,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_add_rule_rejects_percent_over_100() {
        let service = PlanBenefitsService::new(
            Arc::new(MockPlanRepository {
                plan: Some(some_plan()),
            }),
            Arc::new(MockBenefitRepository::with_rules(vec![])),
        );

        let err = service
            .add_rule(
                1,
                NewBenefitRule {
                    kind: BenefitKind::PercentDiscount,
                    service_id: None,
                    condition: BenefitCondition::Always,
                    condition_value: None,
                    percent_off: Some(dec!(150)),
                    fixed_off: None,
                    position: 0,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_rule_requires_weekday_value() {
        let service = PlanBenefitsService::new(
            Arc::new(MockPlanRepository {
                plan: Some(some_plan()),
            }),
            Arc::new(MockBenefitRepository::with_rules(vec![])),
        );

        let err = service
            .add_rule(
                1,
                NewBenefitRule {
                    kind: BenefitKind::FixedDiscount,
                    service_id: None,
                    condition: BenefitCondition::Weekday,
                    condition_value: Some(9),
                    percent_off: None,
                    fixed_off: Some(dec!(5.00)),
                    position: 0,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_listing_unknown_plan_is_not_found() {
        let service = PlanBenefitsService::new(
            Arc::new(MockPlanRepository { plan: None }),
            Arc::new(MockBenefitRepository::with_rules(vec![])),
        );

        let err = service.list(42).await.unwrap_err();
        assert!(matches!(err, AppError::PlanNotFound(_)));
    }

    #[test]
    fn test_descriptions() {
        let rule = percent_rule(1, dec!(10), 0);
        assert_eq!(
            BenefitEvaluator::<MockBenefitRepository>::describe(&rule),
            "Benefício permanente - 10% OFF"
        );

        let rule = BenefitRule {
            condition: BenefitCondition::Weekday,
            condition_value: Some(0),
            ..fixed_rule(2, dec!(5.00), 0)
        };
        assert_eq!(
            BenefitEvaluator::<MockBenefitRepository>::describe(&rule),
            "Desconto de Domingo - R$ 5.00 OFF"
        );
    }
}
