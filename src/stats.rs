//! Corpus statistics.
//!
//! Summarizes what is loaded: texts by language, units by type, and the
//! state of the search ticket queue. Used by `tv5 stats`.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db.path).await?;

    let total_texts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM texts")
        .fetch_one(&pool)
        .await?;
    let total_units: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM units")
        .fetch_one(&pool)
        .await?;
    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM search_tickets WHERE parallels_json IS NULL")
            .fetch_one(&pool)
            .await?;
    let ready: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM search_tickets WHERE parallels_json IS NOT NULL")
            .fetch_one(&pool)
            .await?;
    let oldest_pending: Option<i64> = sqlx::query_scalar(
        "SELECT MIN(created_at) FROM search_tickets WHERE parallels_json IS NULL",
    )
    .fetch_one(&pool)
    .await?;
    let stopword_lists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stopword_lists")
        .fetch_one(&pool)
        .await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Tesserae v5 Corpus Stats");
    println!("=========================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Texts:       {}", total_texts);
    println!("  Units:       {}", total_units);
    println!("  Stopwords:   {} list(s)", stopword_lists);
    println!(
        "  Searches:    {} ready, {} pending{}",
        ready,
        pending,
        oldest_pending
            .map(|ts| format!(" (oldest {})", format_ts_relative(ts)))
            .unwrap_or_default()
    );

    let language_rows = sqlx::query(
        r#"
        SELECT language,
               COUNT(*) AS text_count,
               SUM(CASE WHEN is_prose THEN 1 ELSE 0 END) AS prose_count
        FROM texts
        GROUP BY language
        ORDER BY text_count DESC, language
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !language_rows.is_empty() {
        println!();
        println!("  By language:");
        println!("  {:<16} {:>6} {:>6} {:>6}", "LANGUAGE", "TEXTS", "PROSE", "POETRY");
        println!("  {}", "-".repeat(38));
        for row in &language_rows {
            let language: String = row.get("language");
            let text_count: i64 = row.get("text_count");
            let prose_count: i64 = row.get("prose_count");
            println!(
                "  {:<16} {:>6} {:>6} {:>6}",
                language,
                text_count,
                prose_count,
                text_count - prose_count
            );
        }
    }

    let unit_rows = sqlx::query(
        r#"
        SELECT unit_type, COUNT(*) AS unit_count, COUNT(DISTINCT text) AS text_count
        FROM units
        GROUP BY unit_type
        ORDER BY unit_type
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if !unit_rows.is_empty() {
        println!();
        println!("  By unit type:");
        println!("  {:<16} {:>8} {:>6}", "TYPE", "UNITS", "TEXTS");
        println!("  {}", "-".repeat(32));
        for row in &unit_rows {
            let unit_type: String = row.get("unit_type");
            let unit_count: i64 = row.get("unit_count");
            let text_count: i64 = row.get("text_count");
            println!("  {:<16} {:>8} {:>6}", unit_type, unit_count, text_count);
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a millisecond timestamp relative to now (e.g. "3 hours ago").
fn format_ts_relative(ts_millis: i64) -> String {
    let delta = (chrono::Utc::now().timestamp_millis() - ts_millis) / 1000;

    if delta < 0 {
        return format_ts_iso(ts_millis);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts_millis)
    }
}

fn format_ts_iso(ts_millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ts_millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts_millis.to_string())
}
