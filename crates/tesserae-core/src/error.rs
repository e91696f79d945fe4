//! Error taxonomy shared by every API operation.
//!
//! Each variant carries the context that is echoed back to the client in the
//! JSON error body. The HTTP layer maps variants to status codes through
//! [`ApiError::kind`]; nothing here depends on a web framework.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

/// Coarse classification used to choose a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller error (400).
    BadRequest,
    /// Missing resource (404).
    NotFound,
    /// Backend misbehaved (500).
    Internal,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("malformed CTS URN {cts_urn:?}: {reason}")]
    MalformedIdentifier { cts_urn: String, reason: String },

    #[error("{message}")]
    NotFound { message: String, context: Map<String, Value> },

    /// Missing or mistyped fields, protected-field mutation, duplicate
    /// identifiers, and unparseable query filters.
    #[error("{message}")]
    Validation { message: String, context: Map<String, Value> },

    #[error("no units found for requested types: {}", join(.missing))]
    PartialMiss {
        cts_urn: String,
        requested: BTreeSet<String>,
        missing: BTreeSet<String>,
    },

    /// An otherwise valid write affected an unexpected number of records.
    #[error("{message}")]
    StorageFailure { message: String, context: Map<String, Value> },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MalformedIdentifier { .. }
            | ApiError::Validation { .. }
            | ApiError::PartialMiss { .. } => ErrorKind::BadRequest,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::StorageFailure { .. } | ApiError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Fields echoed next to `message` in the error body.
    pub fn context(&self) -> Map<String, Value> {
        match self {
            ApiError::MalformedIdentifier { cts_urn, .. } => {
                let mut ctx = Map::new();
                ctx.insert("cts_urn".into(), Value::String(cts_urn.clone()));
                ctx
            }
            ApiError::NotFound { context, .. }
            | ApiError::Validation { context, .. }
            | ApiError::StorageFailure { context, .. } => context.clone(),
            ApiError::PartialMiss {
                cts_urn,
                requested,
                missing,
            } => {
                let mut ctx = Map::new();
                ctx.insert("cts_urn".into(), Value::String(cts_urn.clone()));
                ctx.insert("units".into(), string_array(requested));
                ctx.insert("missing".into(), string_array(missing));
                ctx
            }
            ApiError::Store(_) => Map::new(),
        }
    }

    pub fn text_not_found(cts_urn: &str) -> Self {
        ApiError::NotFound {
            message: format!("No text with the CTS URN {cts_urn} was found in the database."),
            context: urn_context(cts_urn),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            context: Map::new(),
        }
    }

    /// Attach a context field, e.g. the offending request body under `data`.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        match &mut self {
            ApiError::NotFound { context, .. }
            | ApiError::Validation { context, .. }
            | ApiError::StorageFailure { context, .. } => {
                context.insert(key.to_string(), value);
            }
            _ => {}
        }
        self
    }
}

pub fn urn_context(cts_urn: &str) -> Map<String, Value> {
    let mut ctx = Map::new();
    ctx.insert("cts_urn".into(), Value::String(cts_urn.to_string()));
    ctx
}

fn string_array(items: &BTreeSet<String>) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn join(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}
