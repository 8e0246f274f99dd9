// rate_limit_middleware.rs
use crate::services::rate_limit::{RateLimitResult, RateLimitService};
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::debug;

const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Serialize)]
struct RateLimitErrorResponse {
    error: String,
    code: String,
    retry_after: u64,
}

/// Extract IP address from request
pub fn extract_ip_address(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> Option<String> {
    // Try X-Forwarded-For header first (for proxied requests)
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            // Take the first IP in the chain
            if let Some(first_ip) = forwarded_str.split(',').next() {
                let first_ip = first_ip.trim();
                if !first_ip.is_empty() {
                    return Some(first_ip.to_string());
                }
            }
        }
    }

    // Try X-Real-IP header
    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return Some(ip_str.trim().to_string());
        }
    }

    // Fall back to connection info
    connect_info.map(|info| info.0.ip().to_string())
}

/// Key under which attempts from this caller are counted.
///
/// Forwarding headers are client-controlled, so they are only honoured when
/// `trust_proxy_headers` is set; otherwise the socket peer is the key.
pub fn client_identity(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> String {
    let ip = if trust_proxy_headers {
        extract_ip_address(headers, connect_info)
    } else {
        connect_info.map(|info| info.0.ip().to_string())
    };
    ip.unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn limited_response(retry_after: u64) -> Response {
    let error_response = RateLimitErrorResponse {
        error: "Too many registration attempts. Please try again later.".to_string(),
        code: "RATE_LIMIT_EXCEEDED".to_string(),
        retry_after,
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();

    if let Ok(retry_header) = HeaderValue::from_str(&retry_after.to_string()) {
        response.headers_mut().insert("retry-after", retry_header);
    }

    response
}

/// Rate limiting middleware for registration attempts
pub async fn rate_limit_middleware(
    Extension(rate_limit_service): Extension<Arc<RateLimitService>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let identity = client_identity(
        request.headers(),
        connect_info.as_ref(),
        rate_limit_service.config().trust_proxy_headers,
    );
    let path = request.uri().path().to_string();

    match rate_limit_service.check_rate_limit(&identity).await {
        RateLimitResult::Allowed => {
            debug!(identity = %identity, path = %path, "Request allowed by rate limiter");
            Ok(next.run(request).await)
        }
        RateLimitResult::Limited { retry_after } => {
            rate_limit_service.log_violation(&identity, &path);
            Err(limited_response(retry_after))
        }
    }
}
