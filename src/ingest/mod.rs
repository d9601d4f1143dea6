//! Document ingestion pipeline: PDF loading, chunking, embedding, and artifact upload.

pub mod chunking;
mod service;
pub mod types;

pub use service::{IngestApi, IngestService};
pub use types::{ChunkingError, IngestError, IngestOutcome};
