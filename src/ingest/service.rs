//! Ingestion service coordinating PDF loading, chunking, embedding, and upload.

use crate::{
    config::{Config, get_config},
    embedding::{EmbeddingClient, HttpEmbeddingClient},
    index::{ChunkEntry, ChunkParams, DocumentSource, VectorIndex, compute_document_hash},
    ingest::{
        chunking::{chunk_offsets, chunk_text},
        types::{IngestError, IngestOutcome},
    },
    metrics::{IngestMetrics, MetricsSnapshot},
    object_store::ObjectStoreClient,
    pdf::{self, PageText},
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

/// Coordinates the full ingestion pipeline: PDF parsing, character-window chunking,
/// embedding, index construction, and artifact upload.
///
/// The service owns long-lived handles to the embedding client, the object store
/// transport, and the metrics registry. Construct it once near process start and
/// share it through an `Arc`.
pub struct IngestService {
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    object_store: ObjectStoreClient,
    metrics: Arc<IngestMetrics>,
}

/// Abstraction over the ingestion pipeline used by the HTTP surface.
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// Run the full pipeline for one uploaded document.
    async fn ingest_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, IngestError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Character offsets of one page's text within the joined document text.
#[derive(Debug, Clone, Copy)]
struct PageSpan {
    number: u32,
    start: usize,
    end: usize,
}

impl IngestService {
    /// Build a new ingestion service, initializing backing clients from configuration.
    ///
    /// Probes the destination bucket so a misconfigured store surfaces at startup
    /// instead of on the first upload.
    pub async fn new() -> Self {
        tracing::info!("Initializing embedding client");
        let embedding_client: Box<dyn EmbeddingClient + Send + Sync> = Box::new(
            HttpEmbeddingClient::new().expect("Failed to initialize embedding client"),
        );
        let object_store =
            ObjectStoreClient::new().expect("Failed to initialize object store client");
        match object_store.bucket_exists().await {
            Ok(true) => tracing::info!("Object store bucket reachable"),
            Ok(false) => tracing::warn!("Object store bucket not found; uploads will fail until it exists"),
            Err(error) => tracing::warn!(error = %error, "Object store probe failed"),
        }
        tracing::info!("Ingestion service ready");

        Self {
            embedding_client,
            object_store,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Build a service with explicitly injected clients.
    pub fn with_clients(
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
        object_store: ObjectStoreClient,
    ) -> Self {
        Self {
            embedding_client,
            object_store,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Run the full pipeline for one uploaded document.
    ///
    /// Scratch files are removed after a successful upload and deliberately kept on
    /// failure so the offending document can be inspected.
    pub async fn ingest_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, IngestError> {
        let config = get_config();
        validate_upload(filename, &bytes)?;

        let request_id = Uuid::new_v4().to_string();
        tracing::info!(
            request_id,
            filename,
            size = bytes.len(),
            "Ingesting document"
        );

        let scratch_pdf = config.scratch_dir.join(format!("{request_id}.pdf"));
        tokio::fs::write(&scratch_pdf, &bytes).await?;

        let pages = pdf::extract_pages(&bytes)?;
        tracing::info!(request_id, pages = pages.len(), "Extracted page text");

        let (text, page_spans) = join_pages(&pages);
        let chunks = chunk_text(&text, config.chunk_size, config.chunk_overlap)?;
        if chunks.is_empty() {
            tracing::warn!(
                request_id,
                scratch = %scratch_pdf.display(),
                "Document produced no text; scratch file kept for inspection"
            );
            return Err(IngestError::EmptyDocument);
        }
        tracing::info!(request_id, chunks = chunks.len(), "Split document into chunks");

        let embeddings = self
            .embedding_client
            .generate_embeddings(chunks.clone())
            .await?;

        let entries = attribute_pages(&chunks, &page_spans, config.chunk_overlap);
        let index = VectorIndex::build(
            &config.embedding_model,
            config.embedding_dimension,
            DocumentSource {
                filename: filename.to_string(),
                sha256: compute_document_hash(&bytes),
            },
            ChunkParams {
                size: config.chunk_size,
                overlap: config.chunk_overlap,
            },
            entries,
            embeddings,
        )?;

        let vectors_path = config.scratch_dir.join(format!("{request_id}.vectors"));
        let metadata_path = config.scratch_dir.join(format!("{request_id}.meta.json"));
        index.save(&vectors_path, &metadata_path)?;

        let (index_key, metadata_key) = remote_artifact_keys(config, &request_id);
        if !config.namespace_remote_artifacts {
            tracing::warn!(
                request_id,
                index_key,
                "Uploading to shared artifact keys; a repeated or concurrent ingestion overwrites the stored index"
            );
        }

        let vector_bytes = tokio::fs::read(&vectors_path).await?;
        self.object_store
            .put_object(&index_key, vector_bytes, "application/octet-stream")
            .await?;
        let metadata_bytes = tokio::fs::read(&metadata_path).await?;
        self.object_store
            .put_object(&metadata_key, metadata_bytes, "application/json")
            .await?;

        cleanup_scratch(&[scratch_pdf, vectors_path, metadata_path]).await;

        self.metrics
            .record_document(pages.len() as u64, chunks.len() as u64);
        tracing::info!(
            request_id,
            pages = pages.len(),
            chunks = chunks.len(),
            index_key,
            metadata_key,
            "Document ingested"
        );

        Ok(IngestOutcome {
            request_id,
            pages: pages.len(),
            chunks: chunks.len(),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            index_key,
            metadata_key,
        })
    }

    /// Return the current ingestion metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl IngestApi for IngestService {
    async fn ingest_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestOutcome, IngestError> {
        IngestService::ingest_document(self, filename, bytes).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        IngestService::metrics_snapshot(self)
    }
}

/// Reject uploads that are not PDFs before any parsing is attempted.
fn validate_upload(filename: &str, bytes: &[u8]) -> Result<(), IngestError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_lowercase);
    if extension.as_deref() != Some("pdf") {
        return Err(IngestError::InvalidUpload(format!(
            "unsupported file type '{filename}'; only PDF uploads are accepted"
        )));
    }
    if !pdf::is_pdf(bytes) {
        return Err(IngestError::InvalidUpload(
            "file does not contain a PDF header".to_string(),
        ));
    }
    Ok(())
}

/// Join page texts with newline separators, recording each page's character span.
fn join_pages(pages: &[PageText]) -> (String, Vec<PageSpan>) {
    let mut text = String::new();
    let mut spans = Vec::new();
    let mut offset = 0usize;

    for page in pages {
        let trimmed = page.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push('\n');
            offset += 1;
        }
        let len = trimmed.chars().count();
        spans.push(PageSpan {
            number: page.number,
            start: offset,
            end: offset + len,
        });
        text.push_str(trimmed);
        offset += len;
    }

    (text, spans)
}

/// Attribute each chunk to the span of source pages it overlaps.
fn attribute_pages(chunks: &[String], spans: &[PageSpan], overlap: usize) -> Vec<ChunkEntry> {
    let offsets = chunk_offsets(chunks, overlap);
    chunks
        .iter()
        .zip(offsets)
        .map(|(chunk, (start, end))| {
            let mut first = None;
            let mut last = None;
            for span in spans {
                if span.start < end && span.end > start {
                    first.get_or_insert(span.number);
                    last = Some(span.number);
                }
            }
            let first = first.unwrap_or(1);
            ChunkEntry {
                text: chunk.clone(),
                first_page: first,
                last_page: last.unwrap_or(first),
            }
        })
        .collect()
}

/// Compute the remote keys for the two index artifacts.
///
/// With namespacing off the keys are shared across all ingestions, matching the
/// single-shared-artifact deployment model; with it on, each request gets its own
/// pair under the configured prefix.
fn remote_artifact_keys(config: &Config, request_id: &str) -> (String, String) {
    let prefix = &config.artifact_key_prefix;
    if config.namespace_remote_artifacts {
        (
            format!("{prefix}/{request_id}.vectors"),
            format!("{prefix}/{request_id}.meta.json"),
        )
    } else {
        (
            format!("{prefix}.vectors"),
            format!("{prefix}.meta.json"),
        )
    }
}

async fn cleanup_scratch(paths: &[PathBuf]) {
    for path in paths {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "Scratch file removed"),
            Err(error) => {
                tracing::debug!(path = %path.display(), error = %error, "Scratch cleanup skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingProvider;
    use std::path::PathBuf;

    fn test_config(namespace: bool) -> Config {
        Config {
            object_store_url: "http://127.0.0.1:9000".into(),
            bucket_name: "artifacts".into(),
            object_store_api_key: None,
            embedding_provider: EmbeddingProvider::OpenAI,
            embedding_url: "http://127.0.0.1:8080".into(),
            embedding_api_key: None,
            embedding_model: "test-model".into(),
            embedding_dimension: 4,
            chunk_size: 1000,
            chunk_overlap: 200,
            scratch_dir: PathBuf::from("/tmp"),
            artifact_key_prefix: "my_index".into(),
            namespace_remote_artifacts: namespace,
            server_port: None,
            max_upload_bytes: 1024,
        }
    }

    #[test]
    fn upload_validation_rejects_wrong_extension() {
        let error = validate_upload("notes.txt", b"%PDF-1.7").unwrap_err();
        assert!(matches!(error, IngestError::InvalidUpload(_)));
    }

    #[test]
    fn upload_validation_rejects_missing_magic() {
        let error = validate_upload("doc.pdf", b"PK\x03\x04 zip archive").unwrap_err();
        assert!(matches!(error, IngestError::InvalidUpload(_)));
    }

    #[test]
    fn upload_validation_accepts_pdf_with_any_extension_case() {
        assert!(validate_upload("Doc.PDF", b"%PDF-1.4 body").is_ok());
    }

    #[test]
    fn join_pages_skips_empty_pages_and_tracks_spans() {
        let pages = vec![
            PageText {
                number: 1,
                text: "first page".into(),
            },
            PageText {
                number: 2,
                text: "   ".into(),
            },
            PageText {
                number: 3,
                text: "third page".into(),
            },
        ];
        let (text, spans) = join_pages(&pages);
        assert_eq!(text, "first page\nthird page");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].number, 1);
        assert_eq!((spans[0].start, spans[0].end), (0, 10));
        assert_eq!(spans[1].number, 3);
        assert_eq!((spans[1].start, spans[1].end), (11, 21));
    }

    #[test]
    fn chunks_are_attributed_to_overlapping_pages() {
        let spans = vec![
            PageSpan {
                number: 1,
                start: 0,
                end: 10,
            },
            PageSpan {
                number: 2,
                start: 11,
                end: 21,
            },
        ];
        // two chunks of 12 chars with 3 chars of overlap: [0,12) and [9,21)
        let chunks = vec!["x".repeat(12), "y".repeat(12)];
        let entries = attribute_pages(&chunks, &spans, 3);
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].first_page, entries[0].last_page), (1, 2));
        assert_eq!((entries[1].first_page, entries[1].last_page), (1, 2));
    }

    #[test]
    fn shared_keys_ignore_the_request_identifier() {
        let config = test_config(false);
        let (index_key, metadata_key) = remote_artifact_keys(&config, "req-123");
        assert_eq!(index_key, "my_index.vectors");
        assert_eq!(metadata_key, "my_index.meta.json");
    }

    #[test]
    fn namespaced_keys_embed_the_request_identifier() {
        let config = test_config(true);
        let (index_key, metadata_key) = remote_artifact_keys(&config, "req-123");
        assert_eq!(index_key, "my_index/req-123.vectors");
        assert_eq!(metadata_key, "my_index/req-123.meta.json");
    }
}
