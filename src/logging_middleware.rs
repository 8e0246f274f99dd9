// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::body::to_bytes;
use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};
use serde_json::Value;
use tracing::{debug, enabled, Level};

/// JSON keys whose values never reach the logs
const REDACTED_KEYS: &[&str] = &["password", "senha", "token", "password_hash"];

/// Replace secret values anywhere in a JSON document
fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.to_lowercase().as_str()) {
                    *inner = Value::String("<redacted>".to_string());
                } else {
                    redact(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

/// Printable form of a body, or `None` when it is empty or not text.
/// Non-JSON bodies are summarized by length since they cannot be redacted.
fn loggable_body(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let body_str = std::str::from_utf8(bytes).ok()?;
    match serde_json::from_str::<Value>(body_str) {
        Ok(mut json) => {
            redact(&mut json);
            Some(serde_json::to_string_pretty(&json).unwrap_or_default())
        }
        Err(_) => Some(format!("<{} bytes of non-JSON body>", bytes.len())),
    }
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(request_body) = loggable_body(&bytes) {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            request_body = %request_body,
            "📥 Request"
        );
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();

    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(response_body) = loggable_body(&bytes) {
        debug!(
            status = %parts.status,
            response_body = %response_body,
            "📤 Response"
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redacts_nested_secrets() {
        let mut body = json!({
            "email": "ana@example.com",
            "senha": "Senha1234",
            "session": { "token": "abc", "expires_at": 1 },
            "attempts": [{ "Password": "x" }]
        });
        redact(&mut body);

        assert_eq!(body["email"], "ana@example.com");
        assert_eq!(body["senha"], "<redacted>");
        assert_eq!(body["session"]["token"], "<redacted>");
        assert_eq!(body["session"]["expires_at"], 1);
        assert_eq!(body["attempts"][0]["Password"], "<redacted>");
    }

    #[test]
    fn test_non_json_body_is_summarized() {
        let logged = loggable_body(b"password=Senha1234").unwrap();
        assert!(!logged.contains("Senha1234"));
        assert!(loggable_body(b"").is_none());
    }
}
