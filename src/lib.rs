//! # Tesserae API
//!
//! HTTP API over a corpus of classical texts addressed by CTS URN, with
//! deferred parallel (intertext) search.
//!
//! The request logic (URN resolution, filters, unit grouping, search
//! tickets) lives in `tesserae-core`. This crate supplies the SQLite store,
//! the axum server, the in-process search worker and the `tv5` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌──────────┐
//! │   HTTP   │──▶│ tesserae-core  │──▶│  SQLite  │
//! │  (axum)  │   │ resolve/filter │   │  Store   │
//! └────┬─────┘   │ units/tickets  │   └────▲─────┘
//!      │         └────────────────┘        │
//!      ▼                                   │
//! ┌──────────┐                             │
//! │  search  │─────────────────────────────┘
//! │  worker  │
//! └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! tv5 init                      # create database
//! tv5 load corpus.json          # load texts, units, stopword lists
//! tv5 get urn:cts:latinLit:phi0917.phi001
//! tv5 serve                     # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite [`Store`](tesserae_core::store::Store) |
//! | [`search_worker`] | Background execution of submitted searches |
//! | [`server`] | HTTP server |
//! | [`load`] | Corpus manifest loading |
//! | [`get`] | Text lookup for the CLI |
//! | [`stats`] | Corpus statistics |

pub mod config;
pub mod db;
pub mod get;
pub mod load;
pub mod migrate;
pub mod search_worker;
pub mod server;
pub mod sqlite_store;
pub mod stats;
