//! Storage abstraction for the Tesserae API.
//!
//! The [`Store`] trait is the whole contract between the API logic and
//! persistence: equality/range finds, inserts, updates and deletes that
//! report how many records they touched. Backends provide per-record
//! atomicity only; nothing here assumes multi-record transactions.
//!
//! Implementations must be `Send + Sync`: a single store is built at
//! start-up and shared by every request handler.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Parallel, SearchTicket, StopwordList, Text, Unit};

/// Inclusive `(low, high)` bounds on a text's year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub low: i64,
    pub high: i64,
}

impl YearRange {
    pub fn contains(&self, year: i64) -> bool {
        self.low <= year && year <= self.high
    }
}

/// Conjunction of equality filters plus a disjunction of year ranges.
///
/// An empty `years` list places no constraint on the year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextQuery {
    pub cts_urn: Option<String>,
    pub author: Option<String>,
    pub is_prose: Option<bool>,
    pub language: Option<String>,
    pub title: Option<String>,
    pub years: Vec<YearRange>,
}

impl TextQuery {
    pub fn by_urn(cts_urn: &str) -> Self {
        Self {
            cts_urn: Some(cts_urn.to_string()),
            ..Default::default()
        }
    }

    /// Evaluate the query against a single text.
    ///
    /// Backends that filter in process use this directly; SQL backends must
    /// agree with it.
    pub fn matches(&self, text: &Text) -> bool {
        fn eq(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |f| f == value)
        }

        eq(&self.cts_urn, &text.cts_urn)
            && eq(&self.author, &text.author)
            && eq(&self.language, &text.language)
            && eq(&self.title, &text.title)
            && self.is_prose.map_or(true, |p| p == text.is_prose)
            && (self.years.is_empty() || self.years.iter().any(|r| r.contains(text.year)))
    }
}

/// Units of one type belonging to one text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitQuery {
    /// The owning text's `path`.
    pub text: String,
    pub unit_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertResult {
    pub inserted_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

/// Abstract storage backend.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_texts`](Store::find_texts) | Texts matching a [`TextQuery`], in insertion order |
/// | [`insert_texts`](Store::insert_texts) | Add new texts |
/// | [`update_text`](Store::update_text) | Replace the text with the same `cts_urn` |
/// | [`delete_text`](Store::delete_text) | Remove a text |
/// | [`find_units`](Store::find_units) | Units of one type for one text, in document order |
/// | [`insert_units`](Store::insert_units) | Add units (ingestion and fixtures) |
/// | [`insert_ticket`](Store::insert_ticket) | Record a submitted search |
/// | [`find_ticket`](Store::find_ticket) | Look a ticket up by id |
/// | [`complete_ticket`](Store::complete_ticket) | Attach results to a pending ticket |
/// | [`pending_ticket_ids`](Store::pending_ticket_ids) | Tickets still waiting for results |
/// | [`upsert_stopword_list`](Store::upsert_stopword_list) | Create or replace a stopword list |
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_texts(&self, query: &TextQuery) -> Result<Vec<Text>>;

    /// Returns the `cts_urn` of every text actually inserted.
    async fn insert_texts(&self, texts: &[Text]) -> Result<InsertResult>;

    /// Matches on `cts_urn`; every other field is overwritten.
    async fn update_text(&self, text: &Text) -> Result<UpdateResult>;

    async fn delete_text(&self, cts_urn: &str) -> Result<DeleteResult>;

    async fn find_units(&self, query: &UnitQuery) -> Result<Vec<Unit>>;

    async fn insert_units(&self, units: &[Unit]) -> Result<InsertResult>;

    async fn insert_ticket(&self, ticket: &SearchTicket) -> Result<InsertResult>;

    async fn find_ticket(&self, id: &str) -> Result<Option<SearchTicket>>;

    /// Only matches a ticket that is still pending.
    async fn complete_ticket(&self, id: &str, parallels: &[Parallel]) -> Result<UpdateResult>;

    /// Ids of pending tickets, oldest first.
    async fn pending_ticket_ids(&self) -> Result<Vec<String>>;

    /// Names of all stopword lists, sorted.
    async fn stopword_list_names(&self) -> Result<Vec<String>>;

    async fn find_stopword_list(&self, name: &str) -> Result<Option<StopwordList>>;

    /// Create the list or replace the one with the same name.
    async fn upsert_stopword_list(&self, list: &StopwordList) -> Result<UpdateResult>;

    async fn delete_stopword_list(&self, name: &str) -> Result<DeleteResult>;
}
