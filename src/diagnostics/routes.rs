//! Diagnostics routes

use axum::{routing::get, Router};

use super::handlers;

/// Creates and returns the diagnostics router
///
/// # Routes
/// - `GET /api/health` - Database connectivity and schema check
pub fn diagnostics_routes() -> Router {
    Router::new().route("/api/health", get(handlers::health_handler))
}
