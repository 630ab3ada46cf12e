//! Subscription handlers
//!
//! HTTP handlers for the /inscricoes endpoints.

use actix_web::{web, HttpResponse};
use navalha_core::AppError;
use navalha_services::PgSubscriptionLifecycle;
use serde_json::json;
use tracing::{debug, instrument};
use validator::Validate;

use crate::dto::{
    CancelSubscriptionRequest, CreateSubscriptionRequest, SubscriptionCreatedResponse,
    SubscriptionSummaryDto,
};

/// Enroll a user in a plan
///
/// POST /inscricoes
#[instrument(skip(lifecycle, body))]
pub async fn create_subscription(
    lifecycle: web::Data<PgSubscriptionLifecycle>,
    body: web::Json<CreateSubscriptionRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;

    let receipt = lifecycle.subscribe(body.into()).await?;

    Ok(HttpResponse::Created().json(SubscriptionCreatedResponse::from(receipt)))
}

/// Cancel a subscription
///
/// PATCH /inscricoes/{id}/cancelar
#[instrument(skip(lifecycle, body))]
pub async fn cancel_subscription(
    lifecycle: web::Data<PgSubscriptionLifecycle>,
    path: web::Path<i32>,
    body: web::Json<CancelSubscriptionRequest>,
) -> Result<HttpResponse, AppError> {
    lifecycle
        .cancel(path.into_inner(), body.motivo.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "mensagem": "Inscrição cancelada com sucesso" })))
}

/// List a user's subscriptions
///
/// GET /inscricoes/usuario/{usuario_id}
#[instrument(skip(lifecycle))]
pub async fn list_user_subscriptions(
    lifecycle: web::Data<PgSubscriptionLifecycle>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let usuario_id = path.into_inner();
    debug!("Listing subscriptions for user {}", usuario_id);

    let subscriptions = lifecycle.list_for_user(usuario_id).await?;
    let subscriptions: Vec<SubscriptionSummaryDto> =
        subscriptions.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(subscriptions))
}

/// Configure subscription routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/inscricoes")
            .route("", web::post().to(create_subscription))
            .route("/usuario/{usuario_id}", web::get().to(list_user_subscriptions))
            .route("/{id}/cancelar", web::patch().to(cancel_subscription)),
    );
}
