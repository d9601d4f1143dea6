//! In-memory vector index built from chunk/vector pairs, and its artifact format.
//!
//! The index is persisted as two files: a binary vectors file and a JSON metadata
//! file describing every chunk. The vectors file layout is:
//!
//! ```text
//! magic "PSIX" | format version u16 LE | dimension u32 LE | count u32 LE | f32 LE rows
//! ```
//!
//! The metadata file carries the model identifier, source document provenance, the
//! chunking parameters, and each chunk's text, hash, and source page span, so a
//! consumer can reconstruct the chunk-to-vector mapping without the original PDF.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use time::OffsetDateTime;

const VECTORS_MAGIC: [u8; 4] = *b"PSIX";
const FORMAT_VERSION: u16 = 1;

/// Errors raised while building or serializing the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No chunks were supplied; an empty index artifact is never written.
    #[error("cannot build an index from zero chunks")]
    Empty,
    /// Chunk and vector counts differ.
    #[error("chunk/vector count mismatch: {chunks} chunks, {vectors} vectors")]
    CountMismatch {
        /// Number of chunks supplied.
        chunks: usize,
        /// Number of vectors supplied.
        vectors: usize,
    },
    /// A vector does not match the declared dimensionality.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Declared index dimensionality.
        expected: usize,
        /// Dimension observed in the offending vector.
        actual: usize,
    },
    /// Artifact bytes did not match the expected binary layout.
    #[error("corrupt vectors artifact: {0}")]
    Corrupt(String),
    /// Filesystem operation failed while writing artifacts.
    #[error("artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Metadata serialization failed.
    #[error("metadata serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A chunk ready for indexing, with its source page attribution.
#[derive(Debug, Clone)]
pub struct ChunkEntry {
    /// Chunk text content.
    pub text: String,
    /// First source page (1-indexed) contributing to this chunk.
    pub first_page: u32,
    /// Last source page contributing to this chunk.
    pub last_page: u32,
}

/// Per-chunk record stored in the metadata artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Chunk text content.
    pub text: String,
    /// SHA-256 digest of the chunk text.
    pub chunk_hash: String,
    /// First source page contributing to this chunk.
    pub first_page: u32,
    /// Last source page contributing to this chunk.
    pub last_page: u32,
}

/// Metadata stored alongside the binary vectors artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Version of the artifact pair layout.
    pub format_version: u16,
    /// Embedding model that produced the vectors.
    pub model: String,
    /// Vector dimensionality.
    pub dimension: usize,
    /// Number of indexed chunks.
    pub chunk_count: usize,
    /// Chunk window size used during splitting, in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks, in characters.
    pub chunk_overlap: usize,
    /// Original filename of the ingested document.
    pub source_filename: String,
    /// SHA-256 digest of the uploaded document bytes.
    pub document_sha256: String,
    /// RFC3339 timestamp of when the index was built.
    pub created_at: String,
    /// Ordered chunk records matching the vector rows.
    pub chunks: Vec<ChunkRecord>,
}

/// Provenance of the document an index was built from.
#[derive(Debug, Clone)]
pub struct DocumentSource {
    /// Original filename as uploaded.
    pub filename: String,
    /// SHA-256 digest of the raw document bytes.
    pub sha256: String,
}

/// Parameters the splitter used, recorded in the artifact for reproducibility.
#[derive(Debug, Clone, Copy)]
pub struct ChunkParams {
    /// Chunk window size in characters.
    pub size: usize,
    /// Overlap between adjacent chunks in characters.
    pub overlap: usize,
}

/// In-memory similarity index pairing chunk records with embedding vectors.
#[derive(Debug)]
pub struct VectorIndex {
    /// Metadata describing the index contents.
    pub metadata: IndexMetadata,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Assemble an index from chunk entries and their embedding vectors.
    ///
    /// Fails fast on empty input and on any count or dimension inconsistency;
    /// partial artifacts are never produced.
    pub fn build(
        model: &str,
        dimension: usize,
        source: DocumentSource,
        params: ChunkParams,
        entries: Vec<ChunkEntry>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self, IndexError> {
        if entries.is_empty() {
            return Err(IndexError::Empty);
        }
        if entries.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                chunks: entries.len(),
                vectors: vectors.len(),
            });
        }
        for vector in &vectors {
            if vector.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
        }

        let chunks: Vec<ChunkRecord> = entries
            .into_iter()
            .map(|entry| ChunkRecord {
                chunk_hash: compute_chunk_hash(&entry.text),
                text: entry.text,
                first_page: entry.first_page,
                last_page: entry.last_page,
            })
            .collect();

        let metadata = IndexMetadata {
            format_version: FORMAT_VERSION,
            model: model.to_string(),
            dimension,
            chunk_count: chunks.len(),
            chunk_size: params.size,
            chunk_overlap: params.overlap,
            source_filename: source.filename,
            document_sha256: source.sha256,
            created_at: current_timestamp_rfc3339(),
            chunks,
        };

        Ok(Self { metadata, vectors })
    }

    /// Number of indexed vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors. Always false for built indexes.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Encode the vectors artifact into its binary layout.
    pub fn encode_vectors(&self) -> Vec<u8> {
        let dimension = self.metadata.dimension;
        let mut buffer =
            Vec::with_capacity(14 + self.vectors.len() * dimension * size_of::<f32>());
        buffer.extend_from_slice(&VECTORS_MAGIC);
        buffer.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buffer.extend_from_slice(&(dimension as u32).to_le_bytes());
        buffer.extend_from_slice(&(self.vectors.len() as u32).to_le_bytes());
        for vector in &self.vectors {
            for value in vector {
                buffer.extend_from_slice(&value.to_le_bytes());
            }
        }
        buffer
    }

    /// Decode a vectors artifact back into rows. Used for verification and tooling.
    pub fn decode_vectors(bytes: &[u8]) -> Result<Vec<Vec<f32>>, IndexError> {
        if bytes.len() < 14 {
            return Err(IndexError::Corrupt("artifact shorter than header".into()));
        }
        if bytes[..4] != VECTORS_MAGIC {
            return Err(IndexError::Corrupt("bad magic".into()));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {version}"
            )));
        }
        let dimension = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]) as usize;
        let count = u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]) as usize;
        let payload = &bytes[14..];
        let expected = count * dimension * size_of::<f32>();
        if payload.len() != expected {
            return Err(IndexError::Corrupt(format!(
                "payload length {} does not match {count} x {dimension} vectors",
                payload.len()
            )));
        }

        let mut rows = Vec::with_capacity(count);
        let mut values = payload
            .chunks_exact(size_of::<f32>())
            .map(|raw| f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
        for _ in 0..count {
            rows.push(values.by_ref().take(dimension).collect());
        }
        Ok(rows)
    }

    /// Serialize the metadata artifact as pretty-printed JSON.
    pub fn metadata_json(&self) -> Result<Vec<u8>, IndexError> {
        Ok(serde_json::to_vec_pretty(&self.metadata)?)
    }

    /// Write both artifacts to the given local paths.
    pub fn save(&self, vectors_path: &Path, metadata_path: &Path) -> Result<(), IndexError> {
        std::fs::write(vectors_path, self.encode_vectors())?;
        std::fs::write(metadata_path, self.metadata_json()?)?;
        tracing::debug!(
            vectors = %vectors_path.display(),
            metadata = %metadata_path.display(),
            chunks = self.metadata.chunk_count,
            "Index artifacts written"
        );
        Ok(())
    }
}

/// Compute a deterministic SHA-256 hash for arbitrary content.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 digest of raw document bytes.
pub fn compute_document_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Current timestamp formatted for artifact metadata.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> VectorIndex {
        VectorIndex::build(
            "test-model",
            3,
            DocumentSource {
                filename: "report.pdf".into(),
                sha256: compute_document_hash(b"raw"),
            },
            ChunkParams {
                size: 1000,
                overlap: 200,
            },
            vec![
                ChunkEntry {
                    text: "first chunk".into(),
                    first_page: 1,
                    last_page: 1,
                },
                ChunkEntry {
                    text: "second chunk".into(),
                    first_page: 1,
                    last_page: 2,
                },
            ],
            vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]],
        )
        .expect("index builds")
    }

    #[test]
    fn build_rejects_empty_input() {
        let error = VectorIndex::build(
            "test-model",
            3,
            DocumentSource {
                filename: "empty.pdf".into(),
                sha256: String::new(),
            },
            ChunkParams {
                size: 1000,
                overlap: 200,
            },
            Vec::new(),
            Vec::new(),
        )
        .unwrap_err();
        assert!(matches!(error, IndexError::Empty));
    }

    #[test]
    fn build_rejects_count_mismatch() {
        let error = VectorIndex::build(
            "test-model",
            2,
            DocumentSource {
                filename: "doc.pdf".into(),
                sha256: String::new(),
            },
            ChunkParams {
                size: 100,
                overlap: 10,
            },
            vec![ChunkEntry {
                text: "only".into(),
                first_page: 1,
                last_page: 1,
            }],
            vec![vec![0.0, 0.0], vec![1.0, 1.0]],
        )
        .unwrap_err();
        assert!(matches!(
            error,
            IndexError::CountMismatch {
                chunks: 1,
                vectors: 2
            }
        ));
    }

    #[test]
    fn build_rejects_dimension_mismatch() {
        let error = VectorIndex::build(
            "test-model",
            2,
            DocumentSource {
                filename: "doc.pdf".into(),
                sha256: String::new(),
            },
            ChunkParams {
                size: 100,
                overlap: 10,
            },
            vec![ChunkEntry {
                text: "only".into(),
                first_page: 1,
                last_page: 1,
            }],
            vec![vec![0.0, 0.0, 0.0]],
        )
        .unwrap_err();
        assert!(matches!(
            error,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn vectors_round_trip_through_binary_layout() {
        let index = sample_index();
        assert_eq!(index.len(), 2);
        assert!(!index.is_empty());
        let encoded = index.encode_vectors();

        assert_eq!(&encoded[..4], b"PSIX");
        assert_eq!(u16::from_le_bytes([encoded[4], encoded[5]]), 1);

        let rows = VectorIndex::decode_vectors(&encoded).expect("decodes");
        assert_eq!(rows, vec![vec![0.1, 0.2, 0.3], vec![0.4, 0.5, 0.6]]);
    }

    #[test]
    fn decode_rejects_truncated_artifact() {
        let index = sample_index();
        let mut encoded = index.encode_vectors();
        encoded.truncate(encoded.len() - 1);
        assert!(matches!(
            VectorIndex::decode_vectors(&encoded),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut encoded = sample_index().encode_vectors();
        encoded[0] = b'X';
        assert!(matches!(
            VectorIndex::decode_vectors(&encoded),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn metadata_records_chunks_and_provenance() {
        let index = sample_index();
        let json = index.metadata_json().expect("serializes");
        let value: serde_json::Value = serde_json::from_slice(&json).expect("valid json");

        assert_eq!(value["model"], "test-model");
        assert_eq!(value["dimension"], 3);
        assert_eq!(value["chunk_count"], 2);
        assert_eq!(value["chunk_size"], 1000);
        assert_eq!(value["chunk_overlap"], 200);
        assert_eq!(value["source_filename"], "report.pdf");
        assert_eq!(value["chunks"][0]["text"], "first chunk");
        assert_eq!(value["chunks"][1]["last_page"], 2);
        assert_eq!(
            value["chunks"][0]["chunk_hash"],
            compute_chunk_hash("first chunk")
        );
        assert!(value["created_at"].as_str().unwrap_or_default().contains('T'));
    }

    #[test]
    fn chunk_hash_is_stable() {
        assert_eq!(compute_chunk_hash("hello"), compute_chunk_hash("hello"));
        assert_ne!(compute_chunk_hash("hello"), compute_chunk_hash("world"));
    }

    #[test]
    fn save_writes_both_artifacts() {
        let dir = std::env::temp_dir().join(format!("pdfsilo-index-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let vectors = dir.join("sample.vectors");
        let metadata = dir.join("sample.meta.json");

        sample_index().save(&vectors, &metadata).expect("saved");

        let raw = std::fs::read(&vectors).expect("vectors readable");
        assert_eq!(&raw[..4], b"PSIX");
        let meta: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&metadata).expect("metadata readable"))
                .expect("valid json");
        assert_eq!(meta["chunk_count"], 2);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
