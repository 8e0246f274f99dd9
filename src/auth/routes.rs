//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/login` - Email and password login, opens a session
/// - `POST /api/logout` - Revoke the current session
/// - `GET /api/me` - Get current user information
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/login", post(handlers::login_handler))
        .route("/api/logout", post(handlers::logout_handler))
        .route("/api/me", get(handlers::me_handler))
}
