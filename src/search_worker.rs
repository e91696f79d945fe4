//! In-process execution of submitted searches.
//!
//! The HTTP handler records a pending ticket and pushes its id onto a
//! [`SearchQueue`]. A single background task drains the queue and runs each
//! ticket through a [`SearchEngine`]. On start the worker first runs every
//! ticket the store still holds as pending, including ones submitted before
//! a restart and ones whose last run failed. When the worker is disabled in
//! configuration no queue exists and tickets stay pending until another
//! process completes them in the shared database.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tesserae_core::models::{Parallel, SearchSpec};
use tesserae_core::store::Store;
use tesserae_core::tickets::{self, SearchEngine};

/// Engine used when no matcher is linked into the binary.
///
/// Completes every search with an empty set of parallels so that clients
/// can exercise the full submit/poll cycle.
pub struct PlaceholderEngine;

#[async_trait]
impl SearchEngine for PlaceholderEngine {
    async fn run(&self, spec: &SearchSpec) -> anyhow::Result<Vec<Parallel>> {
        debug!(
            method = %spec.method.name,
            sources = spec.source.len(),
            targets = spec.target.len(),
            "placeholder engine invoked"
        );
        Ok(Vec::new())
    }
}

/// Sending half of the worker's ticket queue.
#[derive(Clone)]
pub struct SearchQueue {
    tx: mpsc::UnboundedSender<String>,
}

impl SearchQueue {
    /// Schedule a ticket. Returns `false` if the worker has stopped.
    pub fn enqueue(&self, id: &str) -> bool {
        self.tx.send(id.to_string()).is_ok()
    }
}

/// Start the background worker and return its queue.
///
/// Tickets already pending in `store` run before anything sent through the
/// returned queue.
pub fn spawn_search_worker(
    store: Arc<dyn Store>,
    engine: Arc<dyn SearchEngine>,
) -> (SearchQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let handle = tokio::spawn(async move {
        let backlog = match store.pending_ticket_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "could not list pending tickets");
                Vec::new()
            }
        };
        info!(pending = backlog.len(), "search worker started");

        for id in &backlog {
            run_one(store.as_ref(), engine.as_ref(), id).await;
        }
        while let Some(id) = rx.recv().await {
            run_one(store.as_ref(), engine.as_ref(), &id).await;
        }
        info!("search worker stopped");
    });

    (SearchQueue { tx }, handle)
}

async fn run_one(store: &dyn Store, engine: &dyn SearchEngine, id: &str) {
    match tickets::run_ticket(store, engine, id).await {
        Ok(true) => info!(ticket = %id, "search finished"),
        Ok(false) => debug!(ticket = %id, "search already complete"),
        // Left pending; picked up again the next time a worker starts.
        Err(e) => warn!(ticket = %id, error = %e, "search failed"),
    }
}
