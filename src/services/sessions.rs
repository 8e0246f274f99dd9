// src/services/sessions.rs
//! Server-side login sessions.
//!
//! A session row is the revocable half of a login: the token handed to the
//! client only stays valid while its row exists and has not expired.

use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::env;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::common::generate_session_id;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            cookie_secure: false,
        }
    }
}

impl SessionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // SESSION_TTL_HOURS - how long a login stays valid
        if let Ok(ttl) = env::var("SESSION_TTL_HOURS") {
            if let Ok(val) = ttl.parse::<i64>() {
                if val > 0 {
                    config.ttl_hours = val;
                }
            }
        }

        // SESSION_COOKIE_SECURE - set to "true" behind HTTPS
        if let Ok(secure) = env::var("SESSION_COOKIE_SECURE") {
            config.cookie_secure = secure.to_lowercase() == "true";
        }

        config
    }

    pub fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    db_pool: SqlitePool,
}

impl SessionStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }

    /// Open a session for `user_id` lasting `ttl` from now
    pub async fn create(&self, user_id: &str, ttl: Duration) -> Result<Session, SessionError> {
        let now = Utc::now();
        let session = Session {
            id: generate_session_id(),
            user_id: user_id.to_string(),
            created_at: now.timestamp(),
            expires_at: (now + ttl).timestamp(),
        };

        sqlx::query("INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
            .bind(&session.id)
            .bind(&session.user_id)
            .bind(session.created_at)
            .bind(session.expires_at)
            .execute(&self.db_pool)
            .await?;

        debug!(user_id = %user_id, expires_at = session.expires_at, "Session created");
        Ok(session)
    }

    /// Returns the session only if it exists and `now` is before its expiry
    pub async fn find_active(&self, id: &str, now: i64) -> Result<Option<Session>, SessionError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE id = ? AND expires_at > ?",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.db_pool)
        .await?;
        Ok(session)
    }

    /// Returns true when a row was removed
    pub async fn delete(&self, id: &str) -> Result<bool, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired(&self, now: i64) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.db_pool)
            .await?;
        let purged = result.rows_affected();
        if purged > 0 {
            info!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }

    /// Periodically delete expired rows
    pub fn start_cleanup_task(store: Arc<SessionStore>, every: std::time::Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = store.purge_expired(Utc::now().timestamp()).await {
                    warn!(error = %e, "Failed to purge expired sessions");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::test_pool;

    #[tokio::test]
    async fn test_created_session_is_active_until_expiry() {
        let store = SessionStore::new(test_pool().await);
        let session = store.create("U_TEST0001", Duration::hours(24)).await.unwrap();

        assert!(session.id.starts_with("K_"));
        assert_eq!(session.expires_at - session.created_at, 24 * 3600);

        let found = store
            .find_active(&session.id, session.created_at)
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.user_id), Some("U_TEST0001".to_string()));

        let expired = store
            .find_active(&session.id, session.expires_at)
            .await
            .unwrap();
        assert!(expired.is_none());
    }

    #[tokio::test]
    async fn test_deleted_session_is_gone() {
        let store = SessionStore::new(test_pool().await);
        let session = store.create("U_TEST0001", Duration::hours(1)).await.unwrap();

        assert!(store.delete(&session.id).await.unwrap());
        assert!(!store.delete(&session.id).await.unwrap());
        assert!(store
            .find_active(&session.id, session.created_at)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_sessions() {
        let store = SessionStore::new(test_pool().await);
        let short = store.create("U_TEST0001", Duration::hours(1)).await.unwrap();
        let long = store.create("U_TEST0002", Duration::hours(48)).await.unwrap();

        let purged = store.purge_expired(short.expires_at).await.unwrap();
        assert_eq!(purged, 1);
        assert!(store
            .find_active(&long.id, short.expires_at)
            .await
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_default_session_window_is_one_day() {
        assert_eq!(SessionConfig::default().ttl(), Duration::hours(24));
    }
}
