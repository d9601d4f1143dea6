//! HTTP surface for pdfsilo.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `GET /` – Minimal HTML upload form for browser-driven ingestion.
//! - `POST /ingest` – Accept a multipart PDF upload, extract its text, chunk and embed it,
//!   and upload the resulting vector index and metadata artifacts to the object store.
//!   Returns the request identifier, page/chunk counters, and the remote artifact keys.
//! - `GET /metrics` – Observe ingestion counters and the last chunk count.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.

use crate::config::get_config;
use crate::ingest::{IngestApi, IngestError};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Build the HTTP router exposing the ingestion API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: IngestApi + 'static,
{
    Router::new()
        .route("/", get(upload_form))
        .route("/ingest", post(ingest_document::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(get_config().max_upload_bytes))
        .with_state(service)
}

/// Serve a minimal upload form so the endpoint is usable from a browser.
async fn upload_form() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head><title>pdfsilo</title></head>
<body>
  <h1>PDF ingestion</h1>
  <form action="/ingest" method="post" enctype="multipart/form-data">
    <input type="file" name="file" accept="application/pdf" required>
    <button type="submit">Ingest</button>
  </form>
</body>
</html>
"#,
    )
}

/// Success response for the `POST /ingest` endpoint.
#[derive(Serialize)]
struct IngestResponse {
    /// Identifier assigned to this ingestion request.
    request_id: String,
    /// Number of pages extracted from the uploaded document.
    pages: usize,
    /// Number of chunks produced and embedded.
    chunks: usize,
    /// Effective chunk window size in characters.
    chunk_size: usize,
    /// Effective overlap between adjacent chunks in characters.
    chunk_overlap: usize,
    /// Remote key of the uploaded vector artifact.
    index_key: String,
    /// Remote key of the uploaded metadata artifact.
    metadata_key: String,
}

/// Ingest a PDF document uploaded as multipart form data.
///
/// The handler reads the first `file` field, validates it is a PDF, and runs the full
/// chunk/embed/upload pipeline. Other form fields are ignored.
async fn ingest_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError>
where
    S: IngestApi,
{
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::bad_request(format!("invalid multipart body: {error}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::bad_request("file field is missing a filename".into()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|error| AppError::bad_request(format!("failed to read upload: {error}")))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| AppError::bad_request("multipart field 'file' is required".into()))?;
    let outcome = service.ingest_document(&filename, bytes).await?;
    tracing::info!(
        request_id = outcome.request_id,
        filename,
        pages = outcome.pages,
        chunks = outcome.chunks,
        index_key = outcome.index_key,
        "Ingest request completed"
    );
    Ok(Json(IngestResponse {
        request_id: outcome.request_id,
        pages: outcome.pages,
        chunks: outcome.chunks,
        chunk_size: outcome.chunk_size,
        chunk_overlap: outcome.chunk_overlap,
        index_key: outcome.index_key,
        metadata_key: outcome.metadata_key,
    }))
}

/// Return a concise metrics snapshot with document/page/chunk counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Result<Json<MetricsResponse>, AppError>
where
    S: IngestApi,
{
    let snapshot = service.metrics_snapshot();
    Ok(Json(MetricsResponse {
        documents_ingested: snapshot.documents_ingested,
        pages_parsed: snapshot.pages_parsed,
        chunks_embedded: snapshot.chunks_embedded,
        last_chunk_count: snapshot.last_chunk_count,
    }))
}

/// Response body for `GET /metrics`.
#[derive(Serialize)]
struct MetricsResponse {
    documents_ingested: u64,
    pages_parsed: u64,
    chunks_embedded: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_chunk_count: Option<u64>,
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ingest",
                method: "POST",
                path: "/ingest",
                description: "Upload a PDF as the multipart field 'file'; its text is chunked, embedded, and stored as a vector index in the object store. Response returns { \"pages\": number, \"chunks\": number, \"index_key\": string }.",
                request_example: Some(json!({
                    "content_type": "multipart/form-data",
                    "fields": { "file": "report.pdf" }
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// HTTP-facing error wrapper that maps pipeline failures to status codes.
enum AppError {
    /// Malformed request surface (multipart shape, missing fields).
    BadRequest(String),
    /// Failure raised by the ingestion pipeline.
    Ingest(IngestError),
}

impl AppError {
    fn bad_request(message: String) -> Self {
        Self::BadRequest(message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Ingest(error) => {
                let status = match &error {
                    IngestError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
                    IngestError::Pdf(_) | IngestError::EmptyDocument => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    IngestError::Embedding(_) | IngestError::ObjectStore(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, error.to_string())
            }
        };
        tracing::warn!(status = %status, message, "Request failed");
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self::Ingest(inner)
    }
}
