// src/services/users.rs
//! Persistent user store backed by the `usuarios` table.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use thiserror::Error;
use tracing::{debug, warn};

use crate::common::{generate_user_id, safe_email_log};
use crate::registration::models::ValidatedUser;
use crate::registration::EmailLookup;

/// Attempts at a fresh id when a generated one already exists
const MAX_ID_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Email is already registered")]
    Duplicate,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A persisted user row. The password digest is never serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StoredUser {
    pub id: String,
    #[sqlx(rename = "nome")]
    pub name: String,
    pub email: String,
    #[sqlx(rename = "telefone")]
    pub phone: Option<String>,
    #[sqlx(rename = "genero")]
    pub gender: String,
    #[sqlx(rename = "datanascimento")]
    pub birth_date: NaiveDate,
    #[sqlx(rename = "cidade")]
    pub city: String,
    #[sqlx(rename = "estado")]
    pub state: String,
    #[sqlx(rename = "endereco")]
    pub address: String,
    #[sqlx(rename = "senha")]
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

/// Minimal public view returned by registration and login
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl StoredUser {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Persistence for registered users. Doubles as the registration
/// uniqueness lookup.
#[async_trait]
pub trait UserStore: EmailLookup + Send + Sync {
    async fn insert(&self, user: &ValidatedUser) -> Result<StoredUser, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<StoredUser>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct SqliteUserStore {
    db_pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self { db_pool }
    }
}

enum InsertConflict {
    Email,
    Id,
}

fn classify_conflict(e: &sqlx::Error) -> Option<InsertConflict> {
    let db_err = e.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    if db_err.message().contains("usuarios.email") {
        Some(InsertConflict::Email)
    } else {
        Some(InsertConflict::Id)
    }
}

#[async_trait]
impl EmailLookup for SqliteUserStore {
    async fn is_registered(&self, email: &str) -> Result<bool, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT id FROM usuarios WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn insert(&self, user: &ValidatedUser) -> Result<StoredUser, StoreError> {
        let created_at = Utc::now().to_rfc3339();

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = generate_user_id();
            let inserted = sqlx::query(
                r#"
                INSERT INTO usuarios (
                    id, nome, email, telefone, genero, datanascimento,
                    cidade, estado, endereco, senha, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&id)
            .bind(user.name())
            .bind(user.email())
            .bind(user.phone())
            .bind(user.gender().as_str())
            .bind(user.birth_date())
            .bind(user.city())
            .bind(user.state())
            .bind(user.address())
            .bind(user.password_hash())
            .bind(&created_at)
            .execute(&self.db_pool)
            .await;

            match inserted {
                Ok(_) => {
                    debug!(user_id = %id, email = %safe_email_log(user.email()), "User row inserted");
                    return self
                        .find_by_id(&id)
                        .await?
                        .ok_or(StoreError::Database(sqlx::Error::RowNotFound));
                }
                Err(e) => match classify_conflict(&e) {
                    Some(InsertConflict::Email) => return Err(StoreError::Duplicate),
                    Some(InsertConflict::Id) => {
                        warn!(user_id = %id, attempt, "Generated user id already taken, retrying");
                    }
                    None => return Err(StoreError::Database(e)),
                },
            }
        }

        Err(StoreError::Database(sqlx::Error::Protocol(
            "could not allocate a unique user id".to_string(),
        )))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredUser>, StoreError> {
        let user = sqlx::query_as::<_, StoredUser>("SELECT * FROM usuarios WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StoredUser>, StoreError> {
        let user = sqlx::query_as::<_, StoredUser>("SELECT * FROM usuarios WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::test_pool;
    use crate::registration::tests::fixture_user;

    #[tokio::test]
    async fn test_insert_and_find_user() {
        let store = SqliteUserStore::new(test_pool().await);
        let user = fixture_user("ana@example.com").await;

        let stored = store.insert(&user).await.unwrap();
        assert!(stored.id.starts_with("U_"));
        assert_eq!(stored.name, "Ana");
        assert_eq!(stored.email, "ana@example.com");
        assert_eq!(stored.gender, "Feminino");
        assert_eq!(stored.birth_date, user.birth_date());
        assert_ne!(stored.password_hash, "Senha1234");

        let by_email = store.find_by_email("ana@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(stored.id.clone()));

        let by_id = store.find_by_id(&stored.id).await.unwrap();
        assert!(by_id.is_some());
    }

    #[tokio::test]
    async fn test_is_registered_is_case_insensitive() {
        let store = SqliteUserStore::new(test_pool().await);
        store
            .insert(&fixture_user("ana@example.com").await)
            .await
            .unwrap();

        assert!(store.is_registered("ana@example.com").await.unwrap());
        assert!(store.is_registered("ANA@example.com").await.unwrap());
        assert!(!store.is_registered("bia@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_by_constraint() {
        let store = SqliteUserStore::new(test_pool().await);
        store
            .insert(&fixture_user("ana@example.com").await)
            .await
            .unwrap();

        let second = store.insert(&fixture_user("ana@example.com").await).await;
        assert!(matches!(second, Err(StoreError::Duplicate)));
    }

    #[tokio::test]
    async fn test_serialized_user_omits_password_hash() {
        let store = SqliteUserStore::new(test_pool().await);
        let stored = store
            .insert(&fixture_user("ana@example.com").await)
            .await
            .unwrap();

        let json = serde_json::to_value(&stored).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "ana@example.com");
    }
}
