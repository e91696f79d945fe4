//! HTTP API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/texts/` | List texts, filtered by query parameters |
//! | `POST`   | `/texts/` | Create a text (admin) |
//! | `GET`    | `/texts/{urn}/` | Fetch one text |
//! | `PATCH`  | `/texts/{urn}/` | Merge fields into a text (admin) |
//! | `DELETE` | `/texts/{urn}/` | Delete a text (admin) |
//! | `GET`    | `/texts/{urn}/units/` | Unit URNs grouped by requested type |
//! | `POST`   | `/parallels/` | Submit a parallel search |
//! | `GET`    | `/parallels/{id}/` | Poll for search results |
//! | `GET`    | `/stopwords/lists/` | Names of stored stopword lists |
//! | `POST`   | `/stopwords/lists/` | Create or replace a stopword list (admin) |
//! | `GET`    | `/stopwords/lists/{name}/` | Fetch one stopword list |
//! | `DELETE` | `/stopwords/lists/{name}/` | Delete a stopword list (admin) |
//!
//! Admin routes are only registered when `server.admin` is set (or the
//! `ADMIN_INSTANCE=true` environment variable is present at startup).
//!
//! # Redirects
//!
//! A URN finer than the work level is answered with a redirect to the
//! work-level resource: `301` for reads and `308` for writes so that the
//! method and body are preserved.
//!
//! # Error Contract
//!
//! ```json
//! { "message": "No text with the CTS URN ... was found in the database.",
//!   "cts_urn": "urn:cts:latinLit:phi9999.phi001" }
//! ```
//!
//! The fields next to `message` echo whatever context the failing
//! operation reported (`cts_urn`, `data`, `units`, `missing`, `name`, `id`).

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRequestParts, Path, Query, RawQuery, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use tesserae_core::error::{ApiError, ErrorKind};
use tesserae_core::models::SearchSpec;
use tesserae_core::resolve::{resolve, Resolution};
use tesserae_core::store::Store;
use tesserae_core::tickets::{self, TicketStatus};
use tesserae_core::{stopwords, texts, units, urn};

use crate::config::Config;
use crate::search_worker::{spawn_search_worker, PlaceholderEngine, SearchQueue};
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
    /// Present when the in-process search worker is running.
    queue: Option<SearchQueue>,
    retry_after_secs: u64,
}

/// Starts the HTTP server against the configured SQLite database.
///
/// Runs migrations first, so a fresh database path is usable without a
/// separate `tv5 init`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(&config.db.path).await?;
    migrate::migrate_pool(&pool).await?;
    run_server_with_store(config, Arc::new(SqliteStore::new(pool))).await
}

/// Starts the HTTP server on top of an arbitrary [`Store`].
pub async fn run_server_with_store(config: &Config, store: Arc<dyn Store>) -> anyhow::Result<()> {
    let queue = if config.search.worker {
        let (queue, _handle) = spawn_search_worker(store.clone(), Arc::new(PlaceholderEngine));
        Some(queue)
    } else {
        None
    };

    let app = router(
        AppState {
            store,
            queue,
            retry_after_secs: config.server.retry_after_secs,
        },
        config.server.admin,
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        admin = config.server.admin,
        worker = config.search.worker,
        "server listening"
    );
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState, admin: bool) -> Router {
    let mut texts_root: MethodRouter<AppState> = get(handle_list_texts);
    let mut text_item: MethodRouter<AppState> = get(handle_get_text);
    let mut lists_root: MethodRouter<AppState> = get(handle_list_names);
    let mut list_item: MethodRouter<AppState> = get(handle_get_list);

    if admin {
        texts_root = texts_root.post(handle_create_text);
        text_item = text_item.patch(handle_patch_text).delete(handle_delete_text);
        lists_root = lists_root.post(handle_put_list);
        list_item = list_item.delete(handle_delete_list);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/texts/", texts_root)
        .route("/texts/{urn}/", text_item)
        .route("/texts/{urn}/units/", get(handle_get_units))
        .route("/parallels/", post(handle_submit_search))
        .route("/parallels/{id}/", get(handle_get_results))
        .route("/stopwords/lists/", lists_root)
        .route("/stopwords/lists/{name}/", list_item)
        .layer(RequestDecompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// Converts an [`ApiError`] into the uniform JSON error body.
struct AppError(ApiError);

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self.0 {
            ApiError::Store(e) => {
                error!(error = %e, "storage error");
                "An internal error occurred.".to_string()
            }
            ApiError::StorageFailure { message, .. } => {
                error!(%message, "storage failure");
                message.clone()
            }
            other => other.to_string(),
        };

        let mut body = Map::new();
        body.insert("message".into(), Value::String(message));
        body.extend(self.0.context());
        (status, Json(Value::Object(body))).into_response()
    }
}

/// [`Path`] with rejections reported as [`AppError`].
struct ApiPath<T>(T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(AppError(ApiError::validation(format!(
                "Invalid path: {}.",
                rejection.body_text()
            )))),
        }
    }
}

/// [`Query`] with rejections reported as [`AppError`].
struct ApiQuery<T>(T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(AppError(ApiError::validation(format!(
                "Invalid query string: {}.",
                rejection.body_text()
            )))),
        }
    }
}

/// Parse a JSON request body, reporting syntax errors in the error contract
/// rather than as a bare extractor rejection.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError(ApiError::validation(format!("Invalid JSON body: {e}."))))
}

fn redirect(status: StatusCode, location: String) -> Response {
    (status, [(header::LOCATION, location)]).into_response()
}

fn created(location_header: header::HeaderName, location: String, body: Option<Value>) -> Response {
    let headers = [(location_header, location)];
    match body {
        Some(body) => (StatusCode::CREATED, headers, Json(body)).into_response(),
        None => (StatusCode::CREATED, headers).into_response(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ /texts/ ============

async fn handle_list_texts(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> Result<Json<Value>, AppError> {
    let found = texts::list_texts(state.store.as_ref(), &params).await?;
    Ok(Json(json!({ "texts": found })))
}

/// Handler for `POST /texts/` (admin).
///
/// Returns `201` with a `Content-Location` pointing at the new text.
async fn handle_create_text(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = parse_body(&body)?;
    let text = texts::create_text(state.store.as_ref(), &body).await?;
    let location = format!("/texts/{}", urn::encode_path(&text.cts_urn));
    let body = serde_json::to_value(&text).map_err(|e| AppError(anyhow::Error::from(e).into()))?;
    Ok(created(header::CONTENT_LOCATION, location, Some(body)))
}

async fn handle_get_text(
    State(state): State<AppState>,
    ApiPath(cts_urn): ApiPath<String>,
) -> Result<Response, AppError> {
    match resolve(state.store.as_ref(), &cts_urn).await? {
        Resolution::Exact(text) => Ok(Json(text).into_response()),
        Resolution::TooSpecific(canonical) => Ok(redirect(
            StatusCode::MOVED_PERMANENTLY,
            format!("/texts/{canonical}"),
        )),
        Resolution::NotFound => Err(ApiError::text_not_found(&cts_urn).into()),
    }
}

/// Handler for `PATCH /texts/{urn}/` (admin).
///
/// `cts_urn` and `path` may be present in the patch only with their
/// current values.
async fn handle_patch_text(
    State(state): State<AppState>,
    ApiPath(cts_urn): ApiPath<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    match resolve(state.store.as_ref(), &cts_urn).await? {
        Resolution::Exact(text) => {
            let patch: Value = parse_body(&body)?;
            let merged = texts::patch_text(state.store.as_ref(), text, &patch).await?;
            Ok(Json(merged).into_response())
        }
        Resolution::TooSpecific(canonical) => Ok(redirect(
            StatusCode::PERMANENT_REDIRECT,
            format!("/texts/{canonical}"),
        )),
        Resolution::NotFound => Err(ApiError::text_not_found(&cts_urn).into()),
    }
}

async fn handle_delete_text(
    State(state): State<AppState>,
    ApiPath(cts_urn): ApiPath<String>,
) -> Result<Response, AppError> {
    match resolve(state.store.as_ref(), &cts_urn).await? {
        Resolution::Exact(text) => {
            texts::delete_text(state.store.as_ref(), &text).await?;
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        Resolution::TooSpecific(canonical) => Ok(redirect(
            StatusCode::PERMANENT_REDIRECT,
            format!("/texts/{canonical}"),
        )),
        Resolution::NotFound => Err(ApiError::text_not_found(&cts_urn).into()),
    }
}

/// Handler for `GET /texts/{urn}/units/?lines=true&phrases=true`.
///
/// The redirect for an over-specific URN keeps the original query string.
async fn handle_get_units(
    State(state): State<AppState>,
    ApiPath(cts_urn): ApiPath<String>,
    RawQuery(raw_query): RawQuery,
    ApiQuery(params): ApiQuery<HashMap<String, String>>,
) -> Result<Response, AppError> {
    match resolve(state.store.as_ref(), &cts_urn).await? {
        Resolution::Exact(text) => {
            let requested = units::requested_types(&params);
            let grouping = units::aggregate(state.store.as_ref(), &text, &requested).await?;
            Ok(Json(grouping).into_response())
        }
        Resolution::TooSpecific(canonical) => {
            let mut location = format!("/texts/{canonical}units/");
            if let Some(q) = raw_query.filter(|q| !q.is_empty()) {
                location.push('?');
                location.push_str(&q);
            }
            Ok(redirect(StatusCode::MOVED_PERMANENTLY, location))
        }
        Resolution::NotFound => Err(ApiError::text_not_found(&cts_urn).into()),
    }
}

// ============ /parallels/ ============

/// Handler for `POST /parallels/`.
///
/// Records a pending ticket, hands it to the search worker if one is
/// running, and answers `201` with the polling URL in `Location`.
async fn handle_submit_search(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let raw: Value = parse_body(&body)?;
    let spec: SearchSpec = serde_json::from_value(raw.clone()).map_err(|e| {
        AppError(ApiError::validation(format!("Invalid search request: {e}.")).with("data", raw))
    })?;

    let id = tickets::submit(state.store.as_ref(), spec).await?;
    match &state.queue {
        Some(queue) if !queue.enqueue(&id) => {
            warn!(ticket = %id, "search worker is not running; ticket left pending")
        }
        Some(_) => {}
        None => info!(ticket = %id, "no search worker; ticket left pending"),
    }

    Ok(created(header::LOCATION, format!("/parallels/{id}/"), None))
}

/// Handler for `GET /parallels/{id}/`.
///
/// Pending tickets answer `202` with `Retry-After`. Completed tickets answer
/// `200` with a gzip-encoded `{"data": ..., "parallels": [...]}` body.
async fn handle_get_results(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Response, AppError> {
    match tickets::retrieve(state.store.as_ref(), &id).await? {
        TicketStatus::Pending => Ok((
            StatusCode::ACCEPTED,
            [(header::RETRY_AFTER, HeaderValue::from(state.retry_after_secs))],
            Json(json!({ "status": "pending", "id": id })),
        )
            .into_response()),
        TicketStatus::Ready(results) => {
            let body = gzip_json(&results).map_err(|e| AppError(e.into()))?;
            Ok((
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/json"),
                    (header::CONTENT_ENCODING, "gzip"),
                ],
                body,
            )
                .into_response())
        }
    }
}

fn gzip_json<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    serde_json::to_writer(&mut encoder, value)?;
    encoder.flush()?;
    Ok(encoder.finish()?)
}

// ============ /stopwords/lists/ ============

async fn handle_list_names(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let names = state
        .store
        .stopword_list_names()
        .await
        .map_err(|e| AppError(e.into()))?;
    Ok(Json(json!({ "list_names": names })))
}

async fn handle_get_list(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> Result<Response, AppError> {
    let list = stopwords::get_list(state.store.as_ref(), &name).await?;
    Ok(Json(list).into_response())
}

async fn handle_put_list(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, AppError> {
    let body: Value = parse_body(&body)?;
    let list = stopwords::put_list(state.store.as_ref(), &body).await?;
    let location = format!("/stopwords/lists/{}", urn::encode_path(&list.name));
    let body = serde_json::to_value(&list).map_err(|e| AppError(anyhow::Error::from(e).into()))?;
    Ok(created(header::CONTENT_LOCATION, location, Some(body)))
}

async fn handle_delete_list(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> Result<Response, AppError> {
    stopwords::delete_list(state.store.as_ref(), &name).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tesserae_core::models::Parallel;

    #[test]
    fn test_gzip_json_roundtrips() {
        let parallels = vec![Parallel {
            source: "urn:cts:latinLit:phi0917.phi001:1.1".to_string(),
            target: "urn:cts:latinLit:phi0690.phi003:1.1".to_string(),
            matched_features: vec!["arma".to_string()],
            score: 9.0,
        }];
        let compressed = gzip_json(&parallels).unwrap();

        let mut json = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut json)
            .unwrap();
        let decoded: Vec<Parallel> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, parallels);
    }

    #[tokio::test]
    async fn test_error_body_merges_context() {
        let response = AppError(ApiError::text_not_found("urn:cts:latinLit:phi9999.phi001"))
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["cts_urn"], "urn:cts:latinLit:phi9999.phi001");
        assert!(body["message"].as_str().unwrap().contains("phi9999"));
    }

    #[test]
    fn test_store_errors_map_to_500() {
        let response = AppError(anyhow::anyhow!("database is locked").into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
