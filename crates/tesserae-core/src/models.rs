//! Core data models for the Tesserae v5 API.
//!
//! These types are shared between the HTTP server, the CLI, and every
//! [`Store`](crate::store::Store) backend. They serialize to the JSON shapes
//! served by the API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Work-level metadata record.
///
/// The typed fields are the ones every text carries. Anything else a client
/// submits is kept in [`extra`](Text::extra) and flattened back into the JSON
/// object on output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Work-level CTS URN, unique across the corpus.
    pub cts_urn: String,
    pub author: String,
    pub title: String,
    pub language: String,
    pub is_prose: bool,
    /// Publication year; negative for BCE.
    pub year: i64,
    /// Reference to the stored text content. Units point back to this value.
    pub path: String,
    /// Additional fields, ordered by key.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A pre-segmented chunk of a text (a line, a phrase, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// `<text-urn>:<locus>`, optionally with a bracketed offset.
    pub cts_urn: String,
    /// The owning text's [`path`](Text::path).
    pub text: String,
    /// Open-vocabulary tag, e.g. `"lines"` or `"phrases"`.
    pub unit_type: String,
}

/// Matching-method configuration submitted with a search.
///
/// Only `name` is required; the remaining knobs are passed through to the
/// search engine untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMethod {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(default)]
    pub stopwords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq_basis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_basis: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A parallel search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpec {
    /// CTS URNs of the source texts (or loci).
    pub source: Vec<String>,
    /// CTS URNs of the target texts (or loci).
    pub target: Vec<String>,
    pub method: SearchMethod,
}

/// One intertextual parallel found by the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parallel {
    /// Unit URN on the source side.
    pub source: String,
    /// Unit URN on the target side.
    pub target: String,
    #[serde(default)]
    pub matched_features: Vec<String>,
    pub score: f64,
}

/// Persistent record of a submitted search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTicket {
    /// Opaque ticket id (hex UUID).
    pub id: String,
    /// Snapshot of the submitted request.
    pub spec: SearchSpec,
    /// `None` until the search engine has completed the ticket.
    pub parallels: Option<Vec<Parallel>>,
    pub created_at: DateTime<Utc>,
}

impl SearchTicket {
    pub fn is_ready(&self) -> bool {
        self.parallels.is_some()
    }
}

/// A named list of stopwords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopwordList {
    pub name: String,
    pub stopwords: Vec<String>,
}
