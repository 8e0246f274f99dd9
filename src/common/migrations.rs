// src/common/migrations.rs
//! Database schema setup

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
///
/// Tables are created if missing. Setting `RESET_DB=true` drops them first.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    } else {
        info!("ℹ️  Skipping table drop (RESET_DB not set). Tables will be created if they don't exist.");
    }

    create_user_tables(pool).await?;
    create_session_tables(pool).await?;
    create_indexes(pool).await?;

    info!("✅ Database migration completed successfully!");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for table in ["sessions", "usuarios"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Registered users. Column names follow the site's existing `usuarios` schema.
async fn create_user_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS usuarios (
            id TEXT PRIMARY KEY,
            nome TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            telefone TEXT,
            genero TEXT NOT NULL,
            datanascimento TEXT NOT NULL,
            cidade TEXT NOT NULL,
            estado TEXT NOT NULL,
            endereco TEXT NOT NULL,
            senha TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_session_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)")
        .execute(pool)
        .await?;
    Ok(())
}

/// Checks that the users table exists
pub async fn users_table_exists(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'usuarios'")
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // A single connection keeps every query on the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    run_migrations(&pool).await.expect("migrations");
    pool
}
