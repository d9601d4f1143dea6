//! Core data types and error definitions for the ingestion pipeline.

use crate::{
    embedding::EmbeddingClientError, index::IndexError, object_store::ObjectStoreError,
    pdf::PdfError,
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced while splitting text into overlapping windows.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible window size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for the window to advance.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Configured window size.
        chunk_size: usize,
        /// Configured overlap.
        overlap: usize,
    },
}

/// Errors emitted by the document ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The upload was rejected before parsing was attempted.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
    /// PDF loading failed.
    #[error("failed to load PDF: {0}")]
    Pdf(#[from] PdfError),
    /// Chunking step failed to segment the document.
    #[error("failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The document yielded no text to index.
    #[error("document produced no text to index")]
    EmptyDocument,
    /// Embedding provider failed to produce vectors for the chunks.
    #[error("failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Index construction or serialization failed.
    #[error("failed to build index artifact: {0}")]
    Index(#[from] IndexError),
    /// Object store interaction failed during upload.
    #[error("object store upload failed: {0}")]
    ObjectStore(#[from] ObjectStoreError),
    /// Scratch filesystem operation failed.
    #[error("scratch I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Summary of a completed ingestion produced by
/// [`crate::ingest::IngestService::ingest_document`].
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    /// Request identifier assigned to this ingestion.
    pub request_id: String,
    /// Number of pages extracted from the PDF.
    pub pages: usize,
    /// Number of chunks embedded and indexed.
    pub chunks: usize,
    /// Chunk window size used, in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks, in characters.
    pub chunk_overlap: usize,
    /// Remote key of the uploaded vectors artifact.
    pub index_key: String,
    /// Remote key of the uploaded metadata artifact.
    pub metadata_key: String,
}
