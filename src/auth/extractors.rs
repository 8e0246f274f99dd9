//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
        HeaderMap,
    },
};
use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::handlers::SESSION_COOKIE;
use super::models::Claims;
use crate::common::{safe_email_log, safe_token_log, ApiError, AppState};
use crate::services::{SessionError, StoreError};

/// Authenticated user extractor
///
/// Accepts the session token as a Bearer token or as the session cookie.
/// The token must verify and its session row must still be active.
#[derive(Debug)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub session_id: String,
}

/// Pull the raw token from `Authorization: Bearer` or the session cookie
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        let bare = auth.strip_prefix("Bearer ").unwrap_or(auth).trim();
        if !bare.is_empty() {
            return Some(bare.to_string());
        }
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

pub fn decode_claims(token: &str, jwt_secret: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        warn!(error = %e, token = %safe_token_log(token), "JWT token validation failed");
        ApiError::Unauthorized("invalid token".into())
    })
}

/// Resolve the caller behind `headers` to a live session and user
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthedUser, ApiError> {
    let token = match extract_token(headers) {
        Some(t) => t,
        None => {
            debug!("Authentication failed: no session token");
            return Err(ApiError::Unauthorized("missing auth".into()));
        }
    };

    let claims = decode_claims(&token, &state.jwt_secret)?;

    let session = state
        .sessions
        .find_active(&claims.sid, Utc::now().timestamp())
        .await
        .map_err(|e| match e {
            SessionError::Database(e) => ApiError::DatabaseError(e),
        })?;

    let session = match session {
        Some(s) if s.user_id == claims.sub => s,
        _ => {
            warn!(user_id = %claims.sub, "Authentication failed: session revoked or expired");
            return Err(ApiError::Unauthorized("session expired".into()));
        }
    };

    let user = state
        .users
        .find_by_id(&session.user_id)
        .await
        .map_err(|e| match e {
            StoreError::Database(e) => ApiError::DatabaseError(e),
            other => ApiError::InternalServer(other.to_string()),
        })?;

    match user {
        Some(u) => {
            debug!(
                user_id = %u.id,
                email = %safe_email_log(&u.email),
                "User authentication successful via extractor"
            );
            Ok(AuthedUser {
                id: u.id,
                email: u.email,
                session_id: session.id,
            })
        }
        None => {
            warn!(user_id = %session.user_id, "Authentication failed: user not found in database");
            Err(ApiError::Unauthorized("user not found".into()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract the Extension containing the AppState
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();
        authenticate(&app_state, &parts.headers).await
    }
}
