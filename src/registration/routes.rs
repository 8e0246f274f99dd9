//! Registration routes

use axum::{middleware, routing::post, Router};

use super::handlers;
use crate::rate_limit_middleware::rate_limit_middleware;

/// Creates and returns the registration router
///
/// # Routes
/// - `POST /api/register` - Create an account (rate limited per client IP)
/// - `POST /api/register/validate` - Check a candidate without creating it
pub fn registration_routes() -> Router {
    Router::new()
        .route(
            "/api/register",
            post(handlers::register_handler)
                .route_layer(middleware::from_fn(rate_limit_middleware)),
        )
        .route("/api/register/validate", post(handlers::precheck_handler))
}
