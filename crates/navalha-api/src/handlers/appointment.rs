//! Appointment handlers
//!
//! HTTP handlers for the /agendamentos endpoints.

use actix_web::{web, HttpResponse};
use navalha_core::AppError;
use navalha_services::PgBookingCoordinator;
use serde_json::json;
use tracing::{debug, instrument};
use validator::Validate;

use crate::dto::{
    AppointmentActionRequest, AppointmentCreatedResponse, AppointmentListQuery,
    AppointmentListingDto, CreateAppointmentRequest, OccupiedSlotsQuery, OccupiedSlotsResponse,
    RescheduleRequest,
};

/// Book an appointment
///
/// POST /agendamentos
#[instrument(skip(coordinator, body))]
pub async fn create_appointment(
    coordinator: web::Data<PgBookingCoordinator>,
    body: web::Json<CreateAppointmentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    body.validate()?;

    let confirmation = coordinator.book(body.into()).await?;

    Ok(HttpResponse::Created().json(AppointmentCreatedResponse::from(confirmation)))
}

/// List a user's appointments
///
/// GET /agendamentos?usuario_id=
#[instrument(skip(coordinator))]
pub async fn list_appointments(
    coordinator: web::Data<PgBookingCoordinator>,
    query: web::Query<AppointmentListQuery>,
) -> Result<HttpResponse, AppError> {
    debug!("Listing appointments for user {}", query.usuario_id);

    let listings = coordinator.list_for_user(query.usuario_id).await?;
    let listings: Vec<AppointmentListingDto> = listings.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(listings))
}

/// Cancel an appointment
///
/// PATCH /agendamentos/{id}/cancelar
#[instrument(skip(coordinator, body))]
pub async fn cancel_appointment(
    coordinator: web::Data<PgBookingCoordinator>,
    path: web::Path<i32>,
    body: web::Json<AppointmentActionRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    coordinator
        .cancel(path.into_inner(), body.usuario_id)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "mensagem": "Agendamento cancelado com sucesso" })))
}

/// Move an appointment to another slot
///
/// PATCH /agendamentos/{id}/reagendar
#[instrument(skip(coordinator, body))]
pub async fn reschedule_appointment(
    coordinator: web::Data<PgBookingCoordinator>,
    path: web::Path<i32>,
    body: web::Json<RescheduleRequest>,
) -> Result<HttpResponse, AppError> {
    body.validate()?;

    coordinator
        .reschedule(path.into_inner(), body.usuario_id, body.nova_data)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "mensagem": "Agendamento reagendado com sucesso" })))
}

/// Settle an appointment's payment
///
/// PATCH /agendamentos/{id}/pagar
#[instrument(skip(coordinator))]
pub async fn pay_appointment(
    coordinator: web::Data<PgBookingCoordinator>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    coordinator.pay(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({ "mensagem": "Pagamento confirmado com sucesso" })))
}

/// Slots an establishment's barber already holds on a day
///
/// GET /agendamentos/horarios-disponiveis/{estabelecimento_id}?data=
#[instrument(skip(coordinator))]
pub async fn occupied_slots(
    coordinator: web::Data<PgBookingCoordinator>,
    path: web::Path<i32>,
    query: web::Query<OccupiedSlotsQuery>,
) -> Result<HttpResponse, AppError> {
    let occupied = coordinator
        .occupied_slots(path.into_inner(), query.data)
        .await?;

    Ok(HttpResponse::Ok().json(OccupiedSlotsResponse { occupied }))
}

/// Configure appointment routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/agendamentos")
            .route("", web::post().to(create_appointment))
            .route("", web::get().to(list_appointments))
            .route(
                "/horarios-disponiveis/{estabelecimento_id}",
                web::get().to(occupied_slots),
            )
            .route("/{id}/cancelar", web::patch().to(cancel_appointment))
            .route("/{id}/reagendar", web::patch().to(reschedule_appointment))
            .route("/{id}/pagar", web::patch().to(pay_appointment)),
    );
}
