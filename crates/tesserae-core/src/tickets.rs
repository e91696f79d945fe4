//! Deferred parallel-search tickets.
//!
//! Submitting a search only records a pending [`SearchTicket`]; the search
//! itself is run later by a [`SearchEngine`] and attached with [`complete`].
//! Clients poll [`retrieve`] until the ticket is ready.
//!
//! Concrete engines and the machinery that feeds them (a background worker,
//! an external process sharing the database) live in the application crate.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{Parallel, SearchSpec, SearchTicket};
use crate::store::Store;

/// Runs a parallel search.
///
/// Matching, scoring and stopword handling are entirely the engine's
/// business; the ticket machinery only hands it the submitted spec.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    async fn run(&self, spec: &SearchSpec) -> Result<Vec<Parallel>>;
}

/// Payload of a completed ticket: the submitted parameters echoed under
/// `data`, plus the parallels found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub data: SearchSpec,
    pub parallels: Vec<Parallel>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TicketStatus {
    Pending,
    Ready(SearchResults),
}

/// Record a new pending ticket and return its id.
pub async fn submit<S: Store + ?Sized>(store: &S, spec: SearchSpec) -> Result<String, ApiError> {
    let ticket = SearchTicket {
        id: Uuid::new_v4().simple().to_string(),
        spec,
        parallels: None,
        created_at: Utc::now(),
    };
    let result = store.insert_ticket(&ticket).await?;
    if result.inserted_ids.is_empty() {
        return Err(ApiError::StorageFailure {
            message: "The search could not be recorded.".to_string(),
            context: id_context(&ticket.id),
        });
    }
    debug!(ticket = %ticket.id, "search submitted");
    Ok(ticket.id)
}

pub async fn retrieve<S: Store + ?Sized>(store: &S, id: &str) -> Result<TicketStatus, ApiError> {
    let ticket = store
        .find_ticket(id)
        .await?
        .ok_or_else(|| ticket_not_found(id))?;
    Ok(match ticket.parallels {
        Some(parallels) => TicketStatus::Ready(SearchResults {
            data: ticket.spec,
            parallels,
        }),
        None => TicketStatus::Pending,
    })
}

/// Attach results to a pending ticket. A ticket is completed at most once.
pub async fn complete<S: Store + ?Sized>(
    store: &S,
    id: &str,
    parallels: &[Parallel],
) -> Result<(), ApiError> {
    let result = store.complete_ticket(id, parallels).await?;
    if result.matched_count == 1 {
        debug!(ticket = id, parallels = parallels.len(), "search completed");
        return Ok(());
    }
    match store.find_ticket(id).await? {
        Some(_) => Err(ApiError::Validation {
            message: format!("Search {id} has already been completed."),
            context: id_context(id),
        }),
        None => Err(ticket_not_found(id)),
    }
}

/// Run `engine` for a pending ticket and store its results.
///
/// Returns `Ok(false)` when the ticket had already been completed.
pub async fn run_ticket<S, E>(store: &S, engine: &E, id: &str) -> Result<bool, ApiError>
where
    S: Store + ?Sized,
    E: SearchEngine + ?Sized,
{
    let ticket = store
        .find_ticket(id)
        .await?
        .ok_or_else(|| ticket_not_found(id))?;
    if ticket.is_ready() {
        return Ok(false);
    }
    let parallels = engine.run(&ticket.spec).await?;
    complete(store, id, &parallels).await?;
    Ok(true)
}

fn ticket_not_found(id: &str) -> ApiError {
    ApiError::NotFound {
        message: format!("No search results with the id {id} exist."),
        context: id_context(id),
    }
}

fn id_context(id: &str) -> Map<String, Value> {
    let mut ctx = Map::new();
    ctx.insert("id".into(), Value::String(id.to_string()));
    ctx
}
