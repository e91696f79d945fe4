//! Text metadata operations: listing, and the administrative create,
//! partial update and delete.
//!
//! Request bodies arrive as raw JSON objects so that missing or mistyped
//! fields can be reported back to the client together with the submitted
//! data.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};
use tracing::info;

use crate::error::{urn_context, ApiError};
use crate::filter;
use crate::models::Text;
use crate::store::{Store, TextQuery};
use crate::urn;

/// Fields every new text must carry.
pub const REQUIRED_FIELDS: [&str; 7] = [
    "author", "cts_urn", "is_prose", "language", "path", "title", "year",
];

/// Fields a partial update may never change.
pub const PROTECTED_FIELDS: [&str; 2] = ["cts_urn", "path"];

/// Texts matching the listing query parameters, in insertion order.
pub async fn list_texts<S: Store + ?Sized>(
    store: &S,
    params: &HashMap<String, String>,
) -> Result<Vec<Text>, ApiError> {
    let query = filter::query_from_params(params)?;
    Ok(store.find_texts(&query).await?)
}

/// Insert a new text described by `body`.
pub async fn create_text<S: Store + ?Sized>(store: &S, body: &Value) -> Result<Text, ApiError> {
    let echo = |err: ApiError| err.with("data", body.clone());

    let obj = body
        .as_object()
        .ok_or_else(|| echo(ApiError::validation("The request body must be a JSON object.")))?;

    let missing: Vec<&str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|f| !obj.contains_key(*f))
        .collect();
    if !missing.is_empty() {
        return Err(echo(ApiError::validation(format!(
            "The following required fields are missing: {}.",
            missing.join(", ")
        ))));
    }

    let mut text = Text {
        cts_urn: String::new(),
        author: String::new(),
        title: String::new(),
        language: String::new(),
        is_prose: false,
        year: 0,
        path: String::new(),
        extra: BTreeMap::new(),
    };
    for (key, value) in obj {
        set_field(&mut text, key, value).map_err(|m| echo(ApiError::validation(m)))?;
    }

    if urn::parse(&text.cts_urn).is_too_specific() {
        return Err(echo(ApiError::validation(format!(
            "{} is not a work-level CTS URN.",
            text.cts_urn
        ))));
    }

    let existing = store.find_texts(&TextQuery::by_urn(&text.cts_urn)).await?;
    if !existing.is_empty() {
        return Err(echo(ApiError::validation(format!(
            "A text with the CTS URN {} already exists.",
            text.cts_urn
        ))));
    }

    let result = store.insert_texts(std::slice::from_ref(&text)).await?;
    if result.inserted_ids.is_empty() {
        return Err(ApiError::StorageFailure {
            message: format!("The text {} could not be inserted.", text.cts_urn),
            context: urn_context(&text.cts_urn),
        }
        .with("data", body.clone()));
    }
    info!(cts_urn = %text.cts_urn, "text created");
    Ok(text)
}

/// Merge `patch` into a resolved text and store the result.
///
/// New keys are added and existing keys overwritten. Keys in
/// [`PROTECTED_FIELDS`] may only be repeated with their current value.
pub async fn patch_text<S: Store + ?Sized>(
    store: &S,
    text: Text,
    patch: &Value,
) -> Result<Text, ApiError> {
    let echo = |err: ApiError| {
        err.with("cts_urn", Value::String(text.cts_urn.clone()))
            .with("data", patch.clone())
    };

    let obj: &Map<String, Value> = patch
        .as_object()
        .ok_or_else(|| echo(ApiError::validation("The patch must be a JSON object.")))?;

    let current = serde_json::to_value(&text).map_err(anyhow::Error::from)?;
    let changed: Vec<&str> = PROTECTED_FIELDS
        .iter()
        .copied()
        .filter(|f| obj.get(*f).is_some_and(|v| Some(v) != current.get(*f)))
        .collect();
    if !changed.is_empty() {
        return Err(echo(ApiError::validation(format!(
            "The following fields cannot be changed: {}.",
            changed.join(", ")
        ))));
    }

    let mut merged = text.clone();
    for (key, value) in obj {
        set_field(&mut merged, key, value).map_err(|m| echo(ApiError::validation(m)))?;
    }

    let result = store.update_text(&merged).await?;
    if result.matched_count != 1 {
        return Err(ApiError::StorageFailure {
            message: format!(
                "Updating {} matched {} texts.",
                merged.cts_urn, result.matched_count
            ),
            context: urn_context(&merged.cts_urn),
        });
    }
    info!(cts_urn = %merged.cts_urn, fields = obj.len(), "text updated");
    Ok(merged)
}

/// Delete a resolved text.
pub async fn delete_text<S: Store + ?Sized>(store: &S, text: &Text) -> Result<(), ApiError> {
    let result = store.delete_text(&text.cts_urn).await?;
    if result.deleted_count != 1 {
        return Err(ApiError::StorageFailure {
            message: format!(
                "Deleting {} removed {} texts.",
                text.cts_urn, result.deleted_count
            ),
            context: urn_context(&text.cts_urn),
        });
    }
    info!(cts_urn = %text.cts_urn, "text deleted");
    Ok(())
}

fn set_field(text: &mut Text, key: &str, value: &Value) -> Result<(), String> {
    fn string(key: &str, value: &Value) -> Result<String, String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("\"{key}\" must be a string."))
    }

    match key {
        "cts_urn" => text.cts_urn = string(key, value)?,
        "author" => text.author = string(key, value)?,
        "title" => text.title = string(key, value)?,
        "language" => text.language = string(key, value)?,
        "path" => text.path = string(key, value)?,
        "is_prose" => {
            text.is_prose = value
                .as_bool()
                .ok_or_else(|| format!("\"{key}\" must be a boolean."))?
        }
        "year" => {
            text.year = value
                .as_i64()
                .ok_or_else(|| format!("\"{key}\" must be an integer."))?
        }
        _ => {
            text.extra.insert(key.to_string(), value.clone());
        }
    }
    Ok(())
}
