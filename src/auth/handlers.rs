//! Authentication handlers

use axum::{
    extract::{Extension, Json},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::extractors::AuthedUser;
use super::models::{Claims, LoginRequest};
use super::validators::LoginValidator;
use crate::common::{safe_email_log, ApiError, AppState, Validator};
use crate::registration::rules::normalize_email;
use crate::services::password::verify_blocking;
use crate::services::{SessionConfig, SessionError, StoreError};

pub const SESSION_COOKIE: &str = "session";

/// Page the login form sends the user to once signed in
pub const LOGGED_IN_REDIRECT: &str = "home.html";

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn session_cookie(token: &str, config: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        config.ttl().num_seconds()
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn expired_cookie(config: &SessionConfig) -> String {
    let mut cookie = format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", SESSION_COOKIE);
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_headers(cookie: &str) -> Result<HeaderMap, ApiError> {
    let value = HeaderValue::from_str(cookie)
        .map_err(|e| ApiError::InternalServer(format!("invalid cookie header: {}", e)))?;
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, value);
    Ok(headers)
}

fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::Database(e) => ApiError::DatabaseError(e),
        other => ApiError::InternalServer(other.to_string()),
    }
}

fn session_error(e: SessionError) -> ApiError {
    match e {
        SessionError::Database(e) => ApiError::DatabaseError(e),
    }
}

/// POST /api/login
/// Authenticates a registered user by email and password
///
/// # Request Body
/// ```json
/// {
///   "email": "ana@example.com",
///   "password": "Senha@2024"
/// }
/// ```
///
/// # Response
/// ```json
/// {
///   "token": "<jwt token>",
///   "expires_at": 1767225600,
///   "user": { "id": "U_...", "name": "Ana", "email": "ana@example.com" },
///   "redirect": "home.html"
/// }
/// ```
/// The token is also set as an HttpOnly `session` cookie.
pub async fn login_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<(HeaderMap, Json<serde_json::Value>), ApiError> {
    let state = state_lock.read().await.clone();

    let result = LoginValidator::new(state.validator.rules()).validate(&payload);
    if !result.is_valid {
        return Err(result.into());
    }

    let email = normalize_email(&payload.email);
    let user = match state.users.find_by_email(&email).await.map_err(store_error)? {
        Some(u) => u,
        None => {
            warn!(email = %safe_email_log(&email), "Login failed: unknown email");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
    };

    let matches = verify_blocking(
        state.hasher.clone(),
        payload.password.clone(),
        user.password_hash.clone(),
    )
    .await
    .map_err(|e| {
        error!(error = %e, user_id = %user.id, "Stored password digest could not be checked");
        ApiError::InternalServer("password verification failed".to_string())
    })?;

    if !matches {
        warn!(user_id = %user.id, "Login failed: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    let session = state
        .sessions
        .create(&user.id, state.session_config.ttl())
        .await
        .map_err(session_error)?;

    let claims = Claims {
        sub: user.id.clone(),
        sid: session.id.clone(),
        exp: session.expires_at as usize,
    };
    let token = match encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    ) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "JWT encoding error during login");
            return Err(ApiError::InternalServer("jwt error".to_string()));
        }
    };

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User login successful"
    );

    let headers = cookie_headers(&session_cookie(&token, &state.session_config))?;
    let resp = serde_json::json!({
        "token": token,
        "expires_at": session.expires_at,
        "user": user.summary(),
        "redirect": LOGGED_IN_REDIRECT,
    });

    Ok((headers, Json(resp)))
}

/// GET /api/me
/// Returns the current authenticated user's information
///
/// # Response
/// ```json
/// {
///   "user": { ... }
/// }
/// ```
pub async fn me_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    let user = state
        .users
        .find_by_id(&authed.id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| ApiError::NotFound("user not found".to_string()))?;

    Ok(Json(serde_json::json!({ "user": user })))
}

/// POST /api/logout
/// Revokes the caller's session and clears the session cookie
///
/// # Response
/// ```json
/// {
///   "message": "Logout successful"
/// }
/// ```
pub async fn logout_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<(HeaderMap, Json<serde_json::Value>), ApiError> {
    let state = state_lock.read().await.clone();

    state
        .sessions
        .delete(&authed.session_id)
        .await
        .map_err(session_error)?;

    info!(
        user_id = %authed.id,
        email = %safe_email_log(&authed.email),
        "User logout successful"
    );

    let headers = cookie_headers(&expired_cookie(&state.session_config))?;
    Ok((
        headers,
        Json(serde_json::json!({ "message": "Logout successful" })),
    ))
}
