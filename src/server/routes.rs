//! HTTP route handlers for the vector database API.
//!
//! Handlers validate and translate payloads; every engine call runs on the
//! blocking pool since the engine does synchronous file and store I/O.

use crate::error::{ErrorKind, VectorDbError};
use crate::server::AppState;
use crate::types::{Metadata, SearchResult, StoredVector};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// --- Request/Response types ---

#[derive(Deserialize)]
pub struct UpsertRequest {
    #[serde(default)]
    pub id: Option<String>,
    pub vector: Vec<f32>,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
    pub id: String,
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    #[serde(default)]
    pub top_k: Option<i64>,
}

#[derive(Serialize, Deserialize)]
pub struct ListResponse {
    pub vectors: Vec<StoredVector>,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub vector_count: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn engine_error(e: VectorDbError) -> ApiError {
    let status = match e.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Io | ErrorKind::Serialization => {
            error!(error = %e, "engine failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    api_error(status, e.to_string())
}

/// Run a blocking engine call off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(engine_error)
}

// --- Router ---

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/upsert", post(upsert_vector))
        .route("/vectors", get(list_vectors))
        .route("/vectors/:id", delete(delete_vector))
        .route("/search", post(search_vectors))
        .route("/health", get(health))
        .with_state(state)
}

// --- Handlers ---

async fn upsert_vector(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpsertRequest>,
) -> Result<(StatusCode, Json<StatusResponse>), ApiError> {
    if req.vector.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "vector is required"));
    }
    if req.vector.len() != state.dim {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!(
                "Vector dimension mismatch: expected {}, got {}",
                state.dim,
                req.vector.len()
            ),
        ));
    }

    let id = match req.id {
        Some(id) if !id.is_empty() => id,
        _ => uuid::Uuid::new_v4().to_string(),
    };
    let metadata = req.metadata.unwrap_or_default();

    let engine = state.engine.clone();
    let vector = req.vector;
    let upsert_id = id.clone();
    let is_update = blocking(move || engine.upsert(&upsert_id, &vector, metadata)).await?;

    let (status, message) = if is_update {
        (StatusCode::OK, "Vector updated successfully")
    } else {
        (StatusCode::CREATED, "Vector inserted successfully")
    };
    info!(id = %id, is_update, "upsert");

    Ok((
        status,
        Json(StatusResponse {
            status: "success".to_string(),
            message: message.to_string(),
            id,
        }),
    ))
}

async fn list_vectors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListResponse>, ApiError> {
    let engine = state.engine.clone();
    let vectors = blocking(move || engine.scan_all()).await?;
    Ok(Json(ListResponse { vectors }))
}

async fn delete_vector(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let engine = state.engine.clone();
    let delete_id = id.clone();
    let existed = blocking(move || engine.delete(&delete_id)).await?;

    if !existed {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Vector not found: {}", id),
        ));
    }

    Ok(Json(StatusResponse {
        status: "success".to_string(),
        message: format!("Vector with ID {} deleted successfully", id),
        id,
    }))
}

async fn search_vectors(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<Vec<SearchResult>>, ApiError> {
    if req.vector.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "query vector is required"));
    }
    let k = match req.top_k {
        Some(k) if k > 0 => k as usize,
        _ => state.top_k,
    };

    let engine = state.engine.clone();
    let query = req.vector;
    let results = blocking(move || engine.search_knn(&query, k)).await?;
    Ok(Json(results))
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let engine = state.engine.clone();
    let vector_count = blocking(move || engine.len()).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        vector_count,
    }))
}
