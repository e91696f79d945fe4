//! Named stopword lists.

use serde_json::{Map, Value};
use tracing::info;

use crate::error::ApiError;
use crate::models::StopwordList;
use crate::store::Store;

pub async fn get_list<S: Store + ?Sized>(store: &S, name: &str) -> Result<StopwordList, ApiError> {
    store
        .find_stopword_list(name)
        .await?
        .ok_or_else(|| list_not_found(name))
}

/// Create a list from `body`, replacing any list with the same name.
///
/// `body` must carry a string `name` and an array of strings `stopwords`;
/// otherwise the error echoes it back under `data`.
pub async fn put_list<S: Store + ?Sized>(store: &S, body: &Value) -> Result<StopwordList, ApiError> {
    let echo = |message: String| ApiError::validation(message).with("data", body.clone());

    let missing: Vec<&str> = ["name", "stopwords"]
        .into_iter()
        .filter(|f| body.get(*f).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(echo(format!(
            "The following required fields are missing: {}.",
            missing.join(", ")
        )));
    }

    let list: StopwordList = serde_json::from_value(body.clone())
        .map_err(|e| echo(format!("Invalid stopword list: {e}.")))?;
    if list.name.is_empty() {
        return Err(echo("\"name\" must not be empty.".to_string()));
    }

    store.upsert_stopword_list(&list).await?;
    info!(name = %list.name, stopwords = list.stopwords.len(), "stopword list stored");
    Ok(list)
}

pub async fn delete_list<S: Store + ?Sized>(store: &S, name: &str) -> Result<(), ApiError> {
    let result = store.delete_stopword_list(name).await?;
    if result.deleted_count == 0 {
        return Err(list_not_found(name));
    }
    info!(name, "stopword list deleted");
    Ok(())
}

fn list_not_found(name: &str) -> ApiError {
    let mut context = Map::new();
    context.insert("name".into(), Value::String(name.to_string()));
    ApiError::NotFound {
        message: format!("No stopword list named {name} exists."),
        context,
    }
}
