//! Database access for cid-analysis
//!
//! **[CID-DB-010]** SQLite history store

pub mod analyses;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (or create) the history database and run table setup
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // mode=rwc creates the file on first run
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Idempotent schema setup for the analyses history table
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analyses (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            characteristics TEXT NOT NULL,
            culture_medium TEXT NOT NULL,
            colony_age TEXT NOT NULL,
            image_url TEXT NOT NULL,
            result TEXT NOT NULL,
            confidence REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_analyses_user_id ON analyses(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
