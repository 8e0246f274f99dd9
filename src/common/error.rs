// Error handling types for the API

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::fmt;
use tracing::error;

use super::validation::{ValidationError, ValidationResult};

/// API error types
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    NotFound(String),
    InternalServer(String),
    ServiceUnavailable(String),
    DatabaseError(sqlx::Error),
    Validation(Vec<ValidationError>),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::InternalServer(msg) => write!(f, "Internal Server Error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service Unavailable: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database Error: {}", e),
            ApiError::Validation(errors) => {
                let joined: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Validation Error: {}", joined.join(", "))
            }
        }
    }
}

/// JSON error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut errors = Vec::new();
        let (status, error_message, code) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, "UNAUTHORIZED"),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, "NOT_FOUND"),
            ApiError::InternalServer(msg) => {
                // Internal detail stays in the logs
                error!(detail = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR",
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                msg,
                "SERVICE_UNAVAILABLE",
            ),
            ApiError::DatabaseError(e) => {
                error!(error = %e, "Database error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    "INTERNAL_SERVER_ERROR",
                )
            }
            ApiError::Validation(field_errors) => {
                errors = field_errors;
                (
                    StatusCode::BAD_REQUEST,
                    "Validation failed".to_string(),
                    "VALIDATION_ERROR",
                )
            }
        };

        let error_response = ErrorResponse {
            error: error_message,
            code: code.to_string(),
            errors,
        };

        (status, Json(error_response)).into_response()
    }
}

/// Helper function to convert ValidationResult to ApiError
impl From<ValidationResult> for ApiError {
    fn from(result: ValidationResult) -> Self {
        if result.is_valid {
            ApiError::InternalServer(
                "Validation result was valid but converted to error".to_string(),
            )
        } else {
            ApiError::Validation(result.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_validation_error_lists_fields_in_order() {
        let mut result = ValidationResult::new();
        result.add_error("name", "Name is required");
        result.add_error("password", "Password is required");

        let (status, json) = body_json(ApiError::from(result)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["errors"][0]["field"], "name");
        assert_eq!(json["errors"][1]["field"], "password");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let (status, json) = body_json(ApiError::InternalServer(
            "connection refused to sqlite://secret.db".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
        assert!(json.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_database_error_matches_internal_error_body() {
        let (db_status, db_json) = body_json(ApiError::DatabaseError(sqlx::Error::PoolTimedOut)).await;
        let (status, json) = body_json(ApiError::InternalServer("lookup failed".into())).await;

        assert_eq!(db_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(db_status, status);
        assert_eq!(db_json, json);
        assert_eq!(db_json["code"], "INTERNAL_SERVER_ERROR");
    }

    #[tokio::test]
    async fn test_unauthorized_keeps_message() {
        let (status, json) =
            body_json(ApiError::Unauthorized("Invalid email or password".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Invalid email or password");
        assert_eq!(json["code"], "UNAUTHORIZED");
    }
}
