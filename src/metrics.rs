use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestMetrics {
    documents_ingested: AtomicU64,
    pages_parsed: AtomicU64,
    chunks_embedded: AtomicU64,
    last_chunk_count: AtomicU64,
}

impl IngestMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed document with its page and chunk counts.
    pub fn record_document(&self, page_count: u64, chunk_count: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.pages_parsed.fetch_add(page_count, Ordering::Relaxed);
        self.chunks_embedded
            .fetch_add(chunk_count, Ordering::Relaxed);
        self.last_chunk_count.store(chunk_count, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents = self.documents_ingested.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_ingested: documents,
            pages_parsed: self.pages_parsed.load(Ordering::Relaxed),
            chunks_embedded: self.chunks_embedded.load(Ordering::Relaxed),
            last_chunk_count: if documents > 0 {
                Some(self.last_chunk_count.load(Ordering::Relaxed))
            } else {
                None
            },
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Number of documents ingested since startup.
    pub documents_ingested: u64,
    /// Total PDF pages parsed across all ingested documents.
    pub pages_parsed: u64,
    /// Total chunk count embedded across all ingested documents.
    pub chunks_embedded: u64,
    /// Chunk count of the most recent ingestion, when one has occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chunk_count: Option<u64>,
}
