#![deny(missing_docs)]

//! Core library for the pdfsilo ingestion server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and HTTP adapter.
pub mod embedding;
/// In-memory vector index and its artifact serialization.
pub mod index;
/// Document ingestion pipeline orchestration.
pub mod ingest;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// Remote object store integration.
pub mod object_store;
/// PDF page-text extraction.
pub mod pdf;
