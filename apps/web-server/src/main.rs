//! # Quill Web Server
//!
//! The main entry point for the Actix-web HTTP server serving the
//! Quill pages.

use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod templates;

use quill_core::ports::{PasswordService, RateLimiter, TokenService};
use quill_infra::auth::{Argon2PasswordService, JwtTokenService};
use quill_infra::rate_limit::InMemoryRateLimiter;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing();

    // Load configuration
    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Quill web server on {}:{}",
        config.host,
        config.port
    );

    // Build application state and shared services
    let state = AppState::new(config.database.as_ref()).await;
    let token_service: Arc<dyn TokenService> = Arc::new(JwtTokenService::from_env());
    let password_service: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
    let limiter: Arc<dyn RateLimiter> = Arc::new(InMemoryRateLimiter::from_env());

    // Start HTTP server
    HttpServer::new(move || {
        let limiter = limiter.clone();
        App::new()
            .wrap(TracingLogger::default())
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(token_service.clone()))
            .app_data(web::Data::new(password_service.clone()))
            .configure(move |cfg| handlers::configure_routes(cfg, limiter))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,web_server=debug,quill_infra=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}
