//! Diagnostics handlers

use axum::extract::{Extension, Json};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, warn};

use crate::common::migrations::users_table_exists;
use crate::common::{ApiError, AppState};

/// GET /api/health
/// Reports whether the database answers and the users table exists
///
/// # Response
/// ```json
/// {
///   "status": "ok",
///   "database": "connected",
///   "users_table": true
/// }
/// ```
pub async fn health_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = state_lock.read().await.clone();

    if let Err(e) = sqlx::query("SELECT 1").execute(&state.db).await {
        error!(error = %e, "Health check: database unreachable");
        return Err(ApiError::ServiceUnavailable(
            "Database unavailable".to_string(),
        ));
    }

    match users_table_exists(&state.db).await {
        Ok(true) => Ok(Json(serde_json::json!({
            "status": "ok",
            "database": "connected",
            "users_table": true,
        }))),
        Ok(false) => {
            warn!("Health check: usuarios table is missing");
            Err(ApiError::ServiceUnavailable(
                "Users table is missing".to_string(),
            ))
        }
        Err(e) => {
            error!(error = %e, "Health check: schema lookup failed");
            Err(ApiError::ServiceUnavailable(
                "Database unavailable".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::state::test_state;
    use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};

    #[tokio::test]
    async fn test_health_reports_ok() {
        let state = Arc::new(RwLock::new(test_state().await));
        let Json(body) = health_handler(Extension(state)).await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["users_table"], true);
    }

    #[tokio::test]
    async fn test_health_unavailable_without_users_table() {
        let app_state = test_state().await;
        sqlx::query("DROP TABLE usuarios")
            .execute(&app_state.db)
            .await
            .unwrap();

        let err = health_handler(Extension(Arc::new(RwLock::new(app_state))))
            .await
            .unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_health_unavailable_when_pool_closed() {
        let app_state = test_state().await;
        app_state.db.close().await;

        let err = health_handler(Extension(Arc::new(RwLock::new(app_state))))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ServiceUnavailable(_)));
    }
}
