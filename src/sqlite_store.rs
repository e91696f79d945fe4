//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the schema created by
//! [`migrate`](crate::migrate). Open-ended text fields and search payloads
//! are kept as JSON text columns.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

use tesserae_core::models::{Parallel, SearchTicket, StopwordList, Text, Unit};
use tesserae_core::store::{
    DeleteResult, InsertResult, Store, TextQuery, UnitQuery, UpdateResult,
};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const TEXT_COLUMNS: &str = "cts_urn, author, title, language, is_prose, year, path, extra_json";

fn text_from_row(row: &SqliteRow) -> Result<Text> {
    let cts_urn: String = row.get("cts_urn");
    let extra_json: String = row.get("extra_json");
    let extra: BTreeMap<String, Value> = serde_json::from_str(&extra_json)
        .with_context(|| format!("corrupt extra fields for text {cts_urn}"))?;
    Ok(Text {
        cts_urn,
        author: row.get("author"),
        title: row.get("title"),
        language: row.get("language"),
        is_prose: row.get("is_prose"),
        year: row.get("year"),
        path: row.get("path"),
        extra,
    })
}

fn ticket_from_row(row: &SqliteRow) -> Result<SearchTicket> {
    let id: String = row.get("id");
    let spec_json: String = row.get("spec_json");
    let parallels_json: Option<String> = row.get("parallels_json");
    let created_at: i64 = row.get("created_at");

    let spec = serde_json::from_str(&spec_json)
        .with_context(|| format!("corrupt search spec for ticket {id}"))?;
    let parallels = parallels_json
        .map(|json| serde_json::from_str::<Vec<Parallel>>(&json))
        .transpose()
        .with_context(|| format!("corrupt results for ticket {id}"))?;
    let created_at = DateTime::<Utc>::from_timestamp_millis(created_at)
        .with_context(|| format!("invalid creation time for ticket {id}"))?;

    Ok(SearchTicket {
        id,
        spec,
        parallels,
        created_at,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn find_texts(&self, query: &TextQuery) -> Result<Vec<Text>> {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {TEXT_COLUMNS} FROM texts WHERE 1 = 1"));

        for (column, value) in [
            ("cts_urn", &query.cts_urn),
            ("author", &query.author),
            ("language", &query.language),
            ("title", &query.title),
        ] {
            if let Some(value) = value {
                qb.push(format!(" AND {column} = "));
                qb.push_bind(value.clone());
            }
        }
        if let Some(is_prose) = query.is_prose {
            qb.push(" AND is_prose = ");
            qb.push_bind(is_prose);
        }
        if !query.years.is_empty() {
            qb.push(" AND (");
            for (i, range) in query.years.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push("year BETWEEN ");
                qb.push_bind(range.low);
                qb.push(" AND ");
                qb.push_bind(range.high);
            }
            qb.push(")");
        }
        qb.push(" ORDER BY rowid");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(text_from_row).collect()
    }

    async fn insert_texts(&self, texts: &[Text]) -> Result<InsertResult> {
        let mut tx = self.pool.begin().await?;
        let mut inserted_ids = Vec::new();

        for text in texts {
            let extra_json = serde_json::to_string(&text.extra)?;
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO texts (cts_urn, author, title, language, is_prose,
                                             year, path, extra_json)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&text.cts_urn)
            .bind(&text.author)
            .bind(&text.title)
            .bind(&text.language)
            .bind(text.is_prose)
            .bind(text.year)
            .bind(&text.path)
            .bind(&extra_json)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 1 {
                inserted_ids.push(text.cts_urn.clone());
            }
        }

        tx.commit().await?;
        Ok(InsertResult { inserted_ids })
    }

    async fn update_text(&self, text: &Text) -> Result<UpdateResult> {
        let extra_json = serde_json::to_string(&text.extra)?;
        let result = sqlx::query(
            r#"
            UPDATE texts
            SET author = ?, title = ?, language = ?, is_prose = ?, year = ?, path = ?,
                extra_json = ?
            WHERE cts_urn = ?
            "#,
        )
        .bind(&text.author)
        .bind(&text.title)
        .bind(&text.language)
        .bind(text.is_prose)
        .bind(text.year)
        .bind(&text.path)
        .bind(&extra_json)
        .bind(&text.cts_urn)
        .execute(&self.pool)
        .await?;

        Ok(UpdateResult {
            matched_count: result.rows_affected(),
        })
    }

    async fn delete_text(&self, cts_urn: &str) -> Result<DeleteResult> {
        let result = sqlx::query("DELETE FROM texts WHERE cts_urn = ?")
            .bind(cts_urn)
            .execute(&self.pool)
            .await?;
        Ok(DeleteResult {
            deleted_count: result.rows_affected(),
        })
    }

    async fn find_units(&self, query: &UnitQuery) -> Result<Vec<Unit>> {
        let rows = sqlx::query(
            "SELECT cts_urn, text, unit_type FROM units WHERE text = ? AND unit_type = ? ORDER BY id",
        )
        .bind(&query.text)
        .bind(&query.unit_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Unit {
                cts_urn: row.get("cts_urn"),
                text: row.get("text"),
                unit_type: row.get("unit_type"),
            })
            .collect())
    }

    async fn insert_units(&self, units: &[Unit]) -> Result<InsertResult> {
        let mut tx = self.pool.begin().await?;
        let mut inserted_ids = Vec::with_capacity(units.len());

        for unit in units {
            sqlx::query("INSERT INTO units (cts_urn, text, unit_type) VALUES (?, ?, ?)")
                .bind(&unit.cts_urn)
                .bind(&unit.text)
                .bind(&unit.unit_type)
                .execute(&mut *tx)
                .await?;
            inserted_ids.push(unit.cts_urn.clone());
        }

        tx.commit().await?;
        Ok(InsertResult { inserted_ids })
    }

    async fn insert_ticket(&self, ticket: &SearchTicket) -> Result<InsertResult> {
        let spec_json = serde_json::to_string(&ticket.spec)?;
        let parallels_json = ticket
            .parallels
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO search_tickets (id, spec_json, parallels_json, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&ticket.id)
        .bind(&spec_json)
        .bind(&parallels_json)
        .bind(ticket.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        let inserted_ids = if result.rows_affected() == 1 {
            vec![ticket.id.clone()]
        } else {
            Vec::new()
        };
        Ok(InsertResult { inserted_ids })
    }

    async fn find_ticket(&self, id: &str) -> Result<Option<SearchTicket>> {
        let row = sqlx::query(
            "SELECT id, spec_json, parallels_json, created_at FROM search_tickets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn complete_ticket(&self, id: &str, parallels: &[Parallel]) -> Result<UpdateResult> {
        let parallels_json = serde_json::to_string(parallels)?;
        let result = sqlx::query(
            "UPDATE search_tickets SET parallels_json = ? WHERE id = ? AND parallels_json IS NULL",
        )
        .bind(&parallels_json)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(UpdateResult {
            matched_count: result.rows_affected(),
        })
    }

    async fn pending_ticket_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar(
            "SELECT id FROM search_tickets WHERE parallels_json IS NULL ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn stopword_list_names(&self) -> Result<Vec<String>> {
        let names = sqlx::query_scalar("SELECT name FROM stopword_lists ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn find_stopword_list(&self, name: &str) -> Result<Option<StopwordList>> {
        let json: Option<String> =
            sqlx::query_scalar("SELECT stopwords_json FROM stopword_lists WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        json.map(|json| -> Result<StopwordList> {
            let stopwords = serde_json::from_str(&json)
                .with_context(|| format!("corrupt stopword list {name}"))?;
            Ok(StopwordList {
                name: name.to_string(),
                stopwords,
            })
        })
        .transpose()
    }

    async fn upsert_stopword_list(&self, list: &StopwordList) -> Result<UpdateResult> {
        let json = serde_json::to_string(&list.stopwords)?;
        let result = sqlx::query(
            r#"
            INSERT INTO stopword_lists (name, stopwords_json) VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET stopwords_json = excluded.stopwords_json
            "#,
        )
        .bind(&list.name)
        .bind(&json)
        .execute(&self.pool)
        .await?;

        Ok(UpdateResult {
            matched_count: result.rows_affected(),
        })
    }

    async fn delete_stopword_list(&self, name: &str) -> Result<DeleteResult> {
        let result = sqlx::query("DELETE FROM stopword_lists WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(DeleteResult {
            deleted_count: result.rows_affected(),
        })
    }
}
