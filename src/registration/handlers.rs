//! Registration handlers

use axum::{
    extract::{ConnectInfo, Extension, Json},
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::models::{PrecheckResponse, RegistrationCandidate};
use super::rules::EMAIL_TAKEN_MESSAGE;
use crate::common::{safe_email_log, ApiError, AppState, ValidationResult};
use crate::rate_limit_middleware::client_identity;
use crate::services::StoreError;

/// Page the sign-up form sends the user to after an account is created
pub const REGISTERED_REDIRECT: &str = "login-new.html";

/// POST /api/register
/// Validates and stores a new account
///
/// # Request Body
/// ```json
/// {
///   "name": "Ana Souza",
///   "email": "ana@example.com",
///   "phone": "(11) 98765-4321",
///   "gender": "Feminino",
///   "birth_date": "2000-01-15",
///   "city": "São Paulo",
///   "state": "SP",
///   "address": "Rua das Flores, 123",
///   "password": "Senha@2024"
/// }
/// ```
///
/// # Response
/// `201` with the new user's summary, or `400` listing every violated rule
pub async fn register_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(candidate): Json<RegistrationCandidate>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let state = state_lock.read().await.clone();
    debug!(email = %safe_email_log(&candidate.email), "Received registration request");

    let user = state
        .validator
        .validate(
            &candidate,
            state.users.as_ref(),
            state.hasher.clone(),
            Utc::now().date_naive(),
        )
        .await?;

    let stored = match state.users.insert(&user).await {
        Ok(stored) => stored,
        Err(StoreError::Duplicate) => {
            // Lost a race with a concurrent registration of the same address
            warn!(email = %safe_email_log(user.email()), "Duplicate email rejected on insert");
            let mut result = ValidationResult::new();
            result.add_error("email", EMAIL_TAKEN_MESSAGE);
            return Err(result.into());
        }
        Err(StoreError::Database(e)) => return Err(ApiError::DatabaseError(e)),
    };

    let identity = client_identity(
        &headers,
        connect_info.as_ref(),
        state.rate_limit_service.config().trust_proxy_headers,
    );
    state.rate_limit_service.reset(&identity).await;

    info!(
        user_id = %stored.id,
        email = %safe_email_log(&stored.email),
        ip = %identity,
        "User registered successfully"
    );

    let resp = serde_json::json!({
        "message": "Account created successfully",
        "user": stored.summary(),
        "redirect": REGISTERED_REDIRECT,
    });
    Ok((StatusCode::CREATED, Json(resp)))
}

/// POST /api/register/validate
/// Runs every registration rule without creating anything
///
/// # Response
/// ```json
/// {
///   "valid": true,
///   "password_strength": "good"
/// }
/// ```
pub async fn precheck_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(candidate): Json<RegistrationCandidate>,
) -> Result<Json<PrecheckResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let password_strength = state
        .validator
        .precheck(&candidate, state.users.as_ref(), Utc::now().date_naive())
        .await?;

    Ok(Json(PrecheckResponse {
        valid: true,
        password_strength,
    }))
}
