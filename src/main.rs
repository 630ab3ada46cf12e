//! Navalha Backend Server
//!
//! Booking and billing backend for barbershop marketplaces: benefit
//! evaluation, slot-exclusive appointments and subscription lifecycle
//! over a single PostgreSQL store.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use navalha_api::{configure_appointments, configure_plan_benefits, configure_subscriptions};
use navalha_core::config::AppConfig;
use navalha_db::{
    create_pool, PgAppointmentRepository, PgBenefitRepository, PgEstablishmentRepository,
    PgPaymentRepository, PgPlanRepository, PgServiceRepository, PgSubscriptionRepository,
};
use navalha_services::{BookingCoordinator, PlanBenefitsService, SubscriptionLifecycle};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "navalha-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .configure(configure_appointments)
        .configure(configure_subscriptions)
        .configure(configure_plan_benefits);
}

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "navalha_backend={},navalha_api={},navalha_services={},navalha_db={},actix_web=info,sqlx=warn",
            log_level, log_level, log_level, log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting Navalha Backend v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().expect("Failed to load configuration");

    info!("Connecting to database...");
    let pool = create_pool(&config.database.url, Some(config.database.max_connections))
        .await
        .expect("Failed to create database pool");
    let pool = Arc::new(pool);

    info!(
        "Database connection established with {} max connections",
        config.database.max_connections
    );

    // Repositories
    let service_repo = Arc::new(PgServiceRepository::new((*pool).clone()));
    let establishment_repo = Arc::new(PgEstablishmentRepository::new((*pool).clone()));
    let plan_repo = Arc::new(PgPlanRepository::new((*pool).clone()));
    let benefit_repo = Arc::new(PgBenefitRepository::new((*pool).clone()));
    let subscription_repo = Arc::new(PgSubscriptionRepository::new((*pool).clone()));
    let appointment_repo = Arc::new(PgAppointmentRepository::new((*pool).clone()));
    let payment_repo = Arc::new(PgPaymentRepository::new((*pool).clone()));

    // Services
    let booking = web::Data::new(BookingCoordinator::new(
        service_repo,
        establishment_repo,
        subscription_repo.clone(),
        benefit_repo.clone(),
        appointment_repo,
        payment_repo,
        pool.clone(),
        config.billing.clone(),
    ));
    let lifecycle = web::Data::new(SubscriptionLifecycle::new(
        plan_repo.clone(),
        subscription_repo,
        pool.clone(),
        config.billing.clone(),
    ));
    let plan_benefits = web::Data::new(PlanBenefitsService::new(plan_repo, benefit_repo));

    // CORS configuration
    let cors_origins = env::var("CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origins: Vec<&str> = cors_origins_inner.split(',').collect();
                if let Ok(origin_str) = origin.to_str() {
                    origins.iter().any(|o| o.trim() == origin_str)
                } else {
                    false
                }
            })
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(booking.clone())
            .app_data(lifecycle.clone())
            .app_data(plan_benefits.clone())
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest()
                        .json(serde_json::json!({ "erro": error_message })),
                )
                .into()
            }))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest()
                        .json(serde_json::json!({ "erro": error_message })),
                )
                .into()
            }))
            .wrap(cors)
            .wrap(middleware::Logger::new("%a \"%r\" %s %b %Dms"))
            .wrap(middleware::NormalizePath::trim())
            .configure(configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
