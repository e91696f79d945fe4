//! # Tesserae Core
//!
//! Runtime-agnostic logic for the Tesserae v5 API: CTS URN parsing and
//! resolution, text filters, unit grouping, deferred search tickets, and
//! the [`store::Store`] abstraction they all run against.
//!
//! This crate has no tokio, sqlx, or HTTP dependencies. The `tesserae-api`
//! crate provides the SQLite store, the HTTP server and the CLI.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`urn`] | CTS URN parsing, depth, locus and offset |
//! | [`resolve`] | Exact / too-specific / not-found resolution |
//! | [`filter`] | Listing query parameters → [`store::TextQuery`] |
//! | [`units`] | Grouping a text's units by type |
//! | [`tickets`] | Search ticket lifecycle and the [`tickets::SearchEngine`] trait |
//! | [`texts`] | Text create / patch / delete |
//! | [`stopwords`] | Named stopword lists |
//! | [`error`] | Error taxonomy |

pub mod error;
pub mod filter;
pub mod models;
pub mod resolve;
pub mod stopwords;
pub mod store;
pub mod texts;
pub mod tickets;
pub mod units;
pub mod urn;
