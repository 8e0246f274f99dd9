//! Tests for auth module
//!
//! These tests verify core authentication functionality including:
//! - JWT token validation
//! - Login, session lookup and logout
//! - Login form validation

#[cfg(test)]
mod tests {
    use super::super::*;
    use axum::{
        body::to_bytes,
        extract::{Extension, Json},
        http::{header::SET_COOKIE, HeaderMap, StatusCode},
        response::IntoResponse,
    };
    use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use crate::common::state::{test_state, TEST_JWT_SECRET};
    use crate::common::{ApiError, AppState, Validator};
    use crate::registration::tests::fixture_user;

    type SharedState = Arc<RwLock<AppState>>;

    async fn state_with_user() -> SharedState {
        let state = test_state().await;
        state
            .users
            .insert(&fixture_user("ana@example.com").await)
            .await
            .unwrap();
        Arc::new(RwLock::new(state))
    }

    fn login_request(email: &str, password: &str) -> models::LoginRequest {
        models::LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            format!("Bearer {}", token).parse().unwrap(),
        );
        headers
    }

    async fn status_and_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    // ========================================================================
    // JWT
    // ========================================================================

    #[test]
    fn test_jwt_encoding_and_decoding() {
        let claims = models::Claims {
            sub: "U_TEST0001".to_string(),
            sid: "K_SESSION".to_string(),
            exp: 9999999999,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .expect("Failed to encode token");

        let decoded = decode::<models::Claims>(
            &token,
            &DecodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .expect("Failed to decode token");

        assert_eq!(decoded.claims.sub, "U_TEST0001");
        assert_eq!(decoded.claims.sid, "K_SESSION");
    }

    #[test]
    fn test_jwt_validation_fails_with_wrong_secret() {
        let claims = models::Claims {
            sub: "U_TEST0001".to_string(),
            sid: "K_SESSION".to_string(),
            exp: 9999999999,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"some_other_secret"),
        )
        .unwrap();

        assert!(extractors::decode_claims(&token, TEST_JWT_SECRET).is_err());
    }

    #[test]
    fn test_expired_jwt_is_rejected() {
        let claims = models::Claims {
            sub: "U_TEST0001".to_string(),
            sid: "K_SESSION".to_string(),
            exp: 1_000_000_000,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .unwrap();

        assert!(extractors::decode_claims(&token, TEST_JWT_SECRET).is_err());
    }

    // ========================================================================
    // Token extraction
    // ========================================================================

    #[test]
    fn test_extract_token_prefers_bearer() {
        let mut headers = bearer("from-header");
        headers.insert("cookie", "theme=dark; session=from-cookie".parse().unwrap());
        assert_eq!(
            extractors::extract_token(&headers),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("cookie", "theme=dark; session=abc.def.ghi".parse().unwrap());
        assert_eq!(
            extractors::extract_token(&headers),
            Some("abc.def.ghi".to_string())
        );

        let mut cleared = HeaderMap::new();
        cleared.insert("cookie", "session=".parse().unwrap());
        assert_eq!(extractors::extract_token(&cleared), None);
    }

    // ========================================================================
    // Login form validation
    // ========================================================================

    #[tokio::test]
    async fn test_login_validator_reports_missing_fields() {
        let state = test_state().await;
        let validator = validators::LoginValidator::new(state.validator.rules());

        let result = validator.validate(&login_request("", ""));
        assert!(result.has_error("email"));
        assert!(result.has_error("password"));

        let result = validator.validate(&login_request("ana@", "x"));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Email is invalid");
    }

    #[test]
    fn test_login_request_accepts_form_names() {
        let request: models::LoginRequest =
            serde_json::from_str(r#"{"email":"ana@example.com","senha":"Senha1234"}"#).unwrap();
        assert_eq!(request.password, "Senha1234");
        assert!(!format!("{:?}", request).contains("Senha1234"));
    }

    // ========================================================================
    // Login flow
    // ========================================================================

    #[tokio::test]
    async fn test_login_opens_session_and_sets_cookie() {
        let state = state_with_user().await;

        let (headers, Json(body)) = handlers::login_handler(
            Extension(state.clone()),
            Json(login_request("  ANA@example.com ", "Senha1234")),
        )
        .await
        .unwrap();

        assert_eq!(body["redirect"], handlers::LOGGED_IN_REDIRECT);
        assert_eq!(body["user"]["email"], "ana@example.com");

        let token = body["token"].as_str().unwrap().to_string();
        let cookie = headers[SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with(&format!("session={};", token)));
        assert!(cookie.contains("HttpOnly"));

        let app_state = state.read().await.clone();
        let authed = extractors::authenticate(&app_state, &bearer(&token))
            .await
            .unwrap();
        assert_eq!(authed.email, "ana@example.com");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let state = state_with_user().await;

        let wrong = handlers::login_handler(
            Extension(state.clone()),
            Json(login_request("ana@example.com", "Senha9999")),
        )
        .await
        .unwrap_err();
        let unknown = handlers::login_handler(
            Extension(state),
            Json(login_request("bia@example.com", "Senha1234")),
        )
        .await
        .unwrap_err();

        let (wrong_status, wrong_json) = status_and_json(wrong).await;
        let (unknown_status, unknown_json) = status_and_json(unknown).await;
        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_status, unknown_status);
        assert_eq!(wrong_json, unknown_json);
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let state = state_with_user().await;
        let (_, Json(body)) = handlers::login_handler(
            Extension(state.clone()),
            Json(login_request("ana@example.com", "Senha1234")),
        )
        .await
        .unwrap();
        let token = body["token"].as_str().unwrap().to_string();

        let app_state = state.read().await.clone();
        let authed = extractors::authenticate(&app_state, &bearer(&token))
            .await
            .unwrap();

        let (headers, _) = handlers::logout_handler(Extension(state.clone()), authed)
            .await
            .unwrap();
        assert!(headers[SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));

        let after = extractors::authenticate(&app_state, &bearer(&token)).await;
        assert!(matches!(after, Err(ApiError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_me_returns_profile_without_digest() {
        let state = state_with_user().await;
        let (_, Json(body)) = handlers::login_handler(
            Extension(state.clone()),
            Json(login_request("ana@example.com", "Senha1234")),
        )
        .await
        .unwrap();
        let token = body["token"].as_str().unwrap().to_string();

        let app_state = state.read().await.clone();
        let authed = extractors::authenticate(&app_state, &bearer(&token))
            .await
            .unwrap();

        let Json(me) = handlers::me_handler(Extension(state), authed).await.unwrap();
        assert_eq!(me["user"]["email"], "ana@example.com");
        assert_eq!(me["user"]["city"], "SP");
        assert!(me["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app_state = test_state().await;
        let result = extractors::authenticate(&app_state, &HeaderMap::new()).await;
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }
}
