// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod common;
mod diagnostics;
mod logging_middleware;
mod rate_limit_middleware;
mod registration;
mod services;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use common::AppState;
use registration::{RegistrationConfig, RegistrationValidator};
use services::{
    Argon2Hasher, PasswordHashConfig, RateLimitConfig, RateLimitService, SessionConfig,
    SessionStore,
};

const DEFAULT_JWT_SECRET: &str = "replace_with_strong_secret";
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://signup_api.db".to_string());
    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
        warn!("JWT_SECRET not set, using an insecure development secret");
        DEFAULT_JWT_SECRET.to_string()
    });

    let registration_config = RegistrationConfig::from_env();
    info!(
        phone_format = ?registration_config.phone_format,
        phone_required = registration_config.phone_required,
        password_strength_check = registration_config.password_strength_check,
        "Registration rules loaded"
    );
    let session_config = SessionConfig::from_env();
    let hash_config = PasswordHashConfig::from_env();

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    // Run database migrations
    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let validator = RegistrationValidator::new(registration_config)?;
    info!("RegistrationValidator initialized");

    let hasher = Arc::new(Argon2Hasher::new(&hash_config)?);
    info!(
        time_cost = hash_config.time_cost,
        memory_kib = hash_config.memory_kib,
        parallelism = hash_config.parallelism,
        "Argon2Hasher initialized"
    );

    let rate_limit_service = Arc::new(RateLimitService::new(RateLimitConfig::from_env()));
    RateLimitService::start_cleanup_task(rate_limit_service.clone());
    info!("Rate limit cleanup task started");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState::new(
        pool,
        jwt_secret,
        session_config,
        validator,
        hasher,
        rate_limit_service.clone(),
    );

    SessionStore::start_cleanup_task(app_state.sessions.clone(), SESSION_PURGE_INTERVAL);
    info!("Session cleanup task started");

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        // ====================================================================
        // REGISTRATION ROUTES
        // ====================================================================
        .merge(registration::registration_routes())
        // ====================================================================
        // AUTHENTICATION ROUTES
        // ====================================================================
        .merge(auth::auth_routes())
        // ====================================================================
        // DIAGNOSTICS ROUTES
        // ====================================================================
        .merge(diagnostics::diagnostics_routes())
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(rate_limit_service))
        .layer(Extension(shared.clone()))
        .layer({
            // Get CORS origins from environment variable
            let cors_origins = env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                    axum::http::HeaderName::from_static("x-request-id"),
                ])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
