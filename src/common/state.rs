// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::registration::RegistrationValidator;
use crate::services::{
    CredentialHasher, RateLimitService, SessionConfig, SessionStore, SqliteUserStore, UserStore,
};

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub jwt_secret: String,
    pub session_config: SessionConfig,
    pub validator: Arc<RegistrationValidator>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<SessionStore>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub rate_limit_service: Arc<RateLimitService>,
}

impl AppState {
    /// Wire the stores onto `db` and bundle them with the shared services
    pub fn new(
        db: SqlitePool,
        jwt_secret: String,
        session_config: SessionConfig,
        validator: RegistrationValidator,
        hasher: Arc<dyn CredentialHasher>,
        rate_limit_service: Arc<RateLimitService>,
    ) -> Self {
        Self {
            users: Arc::new(SqliteUserStore::new(db.clone())),
            sessions: Arc::new(SessionStore::new(db.clone())),
            db,
            jwt_secret,
            session_config,
            validator: Arc::new(validator),
            hasher,
            rate_limit_service,
        }
    }
}

#[cfg(test)]
pub(crate) const TEST_JWT_SECRET: &str = "test_secret_key";

/// In-memory state with default rules and a cheap hasher
#[cfg(test)]
pub(crate) async fn test_state() -> AppState {
    use crate::registration::config::RegistrationConfig;
    use crate::services::password::test_hasher;
    use crate::services::RateLimitConfig;

    AppState::new(
        super::migrations::test_pool().await,
        TEST_JWT_SECRET.to_string(),
        SessionConfig::default(),
        RegistrationValidator::new(RegistrationConfig::default()).expect("rule patterns compile"),
        test_hasher(),
        Arc::new(RateLimitService::new(RateLimitConfig::default())),
    )
}
