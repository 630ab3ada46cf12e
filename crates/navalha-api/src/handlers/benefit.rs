//! Plan benefit handlers
//!
//! HTTP handlers for the /planos/{id}/beneficios endpoints.

use actix_web::{web, HttpResponse};
use navalha_core::{models::NewBenefitRule, AppError};
use navalha_services::PgPlanBenefitsService;
use tracing::instrument;

use crate::dto::{BenefitRuleDto, CreateBenefitRuleRequest};

/// List a plan's benefit rules in evaluation order
///
/// GET /planos/{plano_id}/beneficios
#[instrument(skip(service))]
pub async fn list_plan_benefits(
    service: web::Data<PgPlanBenefitsService>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let rules = service.list(path.into_inner()).await?;
    let rules: Vec<BenefitRuleDto> = rules.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(rules))
}

/// Attach a new benefit rule to a plan
///
/// POST /planos/{plano_id}/beneficios
#[instrument(skip(service, body))]
pub async fn create_plan_benefit(
    service: web::Data<PgPlanBenefitsService>,
    path: web::Path<i32>,
    body: web::Json<CreateBenefitRuleRequest>,
) -> Result<HttpResponse, AppError> {
    let rule = NewBenefitRule::try_from(body.into_inner())?;
    let created = service.add_rule(path.into_inner(), rule).await?;

    Ok(HttpResponse::Created().json(BenefitRuleDto::from(created)))
}

/// Configure plan benefit routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/planos")
            .route("/{plano_id}/beneficios", web::get().to(list_plan_benefits))
            .route("/{plano_id}/beneficios", web::post().to(create_plan_benefit)),
    );
}
