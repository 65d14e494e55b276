//! HTTP API layer exposing schema CRUD endpoints.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use schema_hub_core::{DocumentMetadata, DocumentStore, ErrorKind, StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::sync::Arc;
use tracing::error;

pub const NAME_HEADER: &str = "x-schema-name";
pub const DESCRIPTION_HEADER: &str = "x-schema-description";

/// Shared application state containing the schema store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
}

#[derive(Deserialize, Default)]
struct SaveMetadata {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct SaveRequest {
    #[serde(default)]
    metadata: SaveMetadata,
    schema: Option<Box<RawValue>>,
}

#[derive(Serialize)]
struct SaveResponse {
    metadata: DocumentMetadata,
    message: &'static str,
}

#[derive(Serialize)]
struct SchemaResponse {
    metadata: DocumentMetadata,
    schema: Box<RawValue>,
}

#[derive(Serialize)]
struct ListResponse {
    schemas: Vec<DocumentMetadata>,
}

#[derive(Serialize)]
struct DeleteResponse {
    message: &'static str,
    id: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error returned by handlers, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match err.kind() {
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Io | ErrorKind::Serialization => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

/// Run a store call on the blocking pool; store operations do synchronous
/// file I/O under the registry lock.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&DocumentStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| ApiError::internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub fn router(store: Arc<DocumentStore>) -> Router {
    let state = AppState { store };
    Router::new()
        .route("/api/schemas", get(list_schemas))
        .route("/api/schemas/", get(missing_id).post(missing_id).delete(missing_id))
        .route(
            "/api/schemas/{id}",
            post(save_schema).get(get_schema).delete(delete_schema),
        )
        .with_state(state)
}

async fn missing_id() -> ApiError {
    ApiError::bad_request("Schema ID is required")
}

async fn save_schema(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SaveResponse>, ApiError> {
    if id.is_empty() {
        return Err(ApiError::bad_request("Schema ID is required"));
    }
    let req: SaveRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("Failed to parse request body: {e}")))?;
    let schema = req
        .schema
        .ok_or_else(|| ApiError::bad_request("Request body must contain a schema"))?;

    let SaveMetadata {
        mut name,
        mut description,
    } = req.metadata;
    if name.is_empty() {
        name = header_value(&headers, NAME_HEADER).unwrap_or_default();
    }
    if description.is_empty() {
        description = header_value(&headers, DESCRIPTION_HEADER).unwrap_or_default();
    }

    let metadata = with_store(&state, move |store| {
        store.save(&id, &name, &description, schema.get().as_bytes())
    })
    .await?;
    Ok(Json(SaveResponse {
        metadata,
        message: "Schema saved successfully",
    }))
}

async fn get_schema(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SchemaResponse>, ApiError> {
    if id.is_empty() {
        return Err(ApiError::bad_request("Schema ID is required"));
    }
    let doc = with_store(&state, move |store| store.get(&id)).await?;
    let schema: Box<RawValue> = serde_json::from_slice(&doc.body).map_err(|e| {
        ApiError::internal(format!(
            "stored schema {} is not valid JSON: {e}",
            doc.metadata.id
        ))
    })?;
    Ok(Json(SchemaResponse {
        metadata: doc.metadata,
        schema,
    }))
}

async fn list_schemas(State(state): State<AppState>) -> Result<Json<ListResponse>, ApiError> {
    let schemas = with_store(&state, |store| Ok(store.list())).await?;
    Ok(Json(ListResponse { schemas }))
}

async fn delete_schema(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if id.is_empty() {
        return Err(ApiError::bad_request("Schema ID is required"));
    }
    let deleted = id.clone();
    with_store(&state, move |store| store.delete(&deleted)).await?;
    Ok(Json(DeleteResponse {
        message: "Schema deleted successfully",
        id,
    }))
}
