//! HTTP surface for pdfvector.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /ingest` – Retrieve a PDF by storage key or URL, structure it into
//!   content units, embed them, and persist the vectors. Re-submitting
//!   byte-identical content returns the stored ids without re-embedding;
//!   `force_reload` deletes the prior generation first.
//! - `POST /search` – Embed a query string and run a cosine-similarity search,
//!   optionally scoped to one document fingerprint.
//! - `GET /metrics` – Observe ingestion and search counters.
//! - `GET /health` – Liveness probe.
//!
//! Error responses map the pipeline taxonomy onto HTTP status codes: input
//! errors are 400, a missing source is 404, unparseable documents are 422,
//! and infrastructure failures downstream are 502.

use crate::pipeline::{
    DocumentSource, IngestError, IngestStatus, PipelineApi, SearchError, SearchHit,
    SearchRequest,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the ingestion and search API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: PipelineApi + 'static,
{
    Router::new()
        .route("/ingest", post(ingest_document::<S>))
        .route("/search", post(search_documents::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/health", get(health))
        .with_state(service)
}

/// Request body for the `POST /ingest` endpoint.
#[derive(Deserialize)]
struct IngestRequest {
    /// Key of the document in the configured storage bucket.
    #[serde(default)]
    source_key: Option<String>,
    /// Public URL of the document.
    #[serde(default)]
    source_url: Option<String>,
    /// Delete the fingerprint's prior vectors and reprocess.
    #[serde(default)]
    force_reload: bool,
}

/// Success response for the `POST /ingest` endpoint.
#[derive(Serialize)]
struct IngestResponse {
    /// Terminal state of the request.
    status: IngestStatus,
    /// Fingerprint computed over the document bytes.
    fingerprint: String,
    /// Identifiers of the stored content units.
    unit_ids: Vec<String>,
}

/// Ingest a document into the vector collection.
async fn ingest_document<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError>
where
    S: PipelineApi,
{
    let source = match (request.source_key, request.source_url) {
        (Some(key), None) => DocumentSource::StorageKey(key),
        (None, Some(url)) => DocumentSource::Url(url),
        (None, None) => return Err(AppError::Ingest(IngestError::MissingSource)),
        (Some(_), Some(_)) => return Err(AppError::Ingest(IngestError::ConflictingSource)),
    };

    let outcome = service.ingest(source, request.force_reload).await?;
    tracing::info!(
        status = ?outcome.status,
        fingerprint = %outcome.fingerprint,
        units = outcome.unit_ids.len(),
        "Ingest request completed"
    );
    Ok(Json(IngestResponse {
        status: outcome.status,
        fingerprint: outcome.fingerprint,
        unit_ids: outcome.unit_ids,
    }))
}

/// Request body for the `POST /search` endpoint.
#[derive(Deserialize)]
struct SearchRequestBody {
    /// Natural language query.
    query: String,
    /// Optional result limit (clamped server-side).
    #[serde(default)]
    limit: Option<usize>,
    /// Optional fingerprint restricting results to one document.
    #[serde(default)]
    file_hash: Option<String>,
}

/// Response body for the `POST /search` endpoint.
#[derive(Serialize)]
struct SearchResponse {
    hits: Vec<SearchHit>,
}

/// Run a similarity search over stored content units.
async fn search_documents<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SearchRequestBody>,
) -> Result<Json<SearchResponse>, AppError>
where
    S: PipelineApi,
{
    let hits = service
        .search(SearchRequest {
            query_text: request.query,
            limit: request.limit,
            file_hash: request.file_hash,
        })
        .await?;
    Ok(Json(SearchResponse { hits }))
}

/// Return a concise metrics snapshot with ingestion and search counters.
async fn get_metrics<S>(
    State(service): State<Arc<S>>,
) -> Json<crate::metrics::MetricsSnapshot>
where
    S: PipelineApi,
{
    Json(service.metrics_snapshot())
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

enum AppError {
    Ingest(IngestError),
    Search(SearchError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Ingest(error) => match error {
                IngestError::MissingSource | IngestError::ConflictingSource => {
                    StatusCode::BAD_REQUEST
                }
                IngestError::SourceNotFound(_) => StatusCode::NOT_FOUND,
                IngestError::Partition(_) | IngestError::Extraction(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                IngestError::Retrieval { .. }
                | IngestError::Embedding(_)
                | IngestError::VectorStore(_) => StatusCode::BAD_GATEWAY,
                IngestError::DimensionMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Search(error) => match error {
                SearchError::Embedding(_) | SearchError::VectorStore(_) => StatusCode::BAD_GATEWAY,
                SearchError::DimensionMismatch { .. } | SearchError::EmptyEmbedding => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Ingest(error) => error.to_string(),
            Self::Search(error) => error.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self::Ingest(inner)
    }
}

impl From<SearchError> for AppError {
    fn from(inner: SearchError) -> Self {
        Self::Search(inner)
    }
}
