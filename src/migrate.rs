//! Idempotent schema creation.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create every table and index if missing. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // Texts: rowid order is insertion order.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS texts (
            cts_urn TEXT PRIMARY KEY,
            author TEXT NOT NULL,
            title TEXT NOT NULL,
            language TEXT NOT NULL,
            is_prose INTEGER NOT NULL,
            year INTEGER NOT NULL,
            path TEXT NOT NULL,
            extra_json TEXT NOT NULL DEFAULT '{}'
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Units: `id` preserves document order within a text.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS units (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            cts_urn TEXT NOT NULL,
            text TEXT NOT NULL,
            unit_type TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_tickets (
            id TEXT PRIMARY KEY,
            spec_json TEXT NOT NULL,
            parallels_json TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stopword_lists (
            name TEXT PRIMARY KEY,
            stopwords_json TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_units_text_type ON units(text, unit_type, id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_texts_year ON texts(year)")
        .execute(pool)
        .await?;

    Ok(())
}
