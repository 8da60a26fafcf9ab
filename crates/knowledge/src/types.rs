//! Knowledge system type definitions.

use crate::embeddings::EmbeddingConfig;
use crate::vector_index::Metric;
use chrono::{DateTime, Utc};
use drugsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeBaseConfig {
    /// Name of the knowledge base
    #[serde(default)]
    pub name: String,

    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks, in characters
    #[serde(default)]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Similarity metric of the vector index
    #[serde(default)]
    pub metric: Metric,

    /// Embedding provider settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_top_k() -> usize {
    1
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
            top_k: default_top_k(),
            metric: Metric::default(),
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl KnowledgeBaseConfig {
    /// Check chunking and retrieval settings.
    pub fn validate(&self) -> AppResult<()> {
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be greater than 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }
        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "embedding.dimensions must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Raw text of one page (PDF) or one whole file (text), with its citation label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// Name of the document the page came from
    pub document: String,

    /// Source label used for citation
    pub source: String,

    /// Extracted text
    pub text: String,
}

/// A document that could not be extracted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub name: String,
    pub reason: String,
}

/// A bounded text segment with its source label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic content identifier
    pub id: String,

    /// Source label inherited from the page
    pub source: String,

    /// Position within the page
    pub position: u32,

    /// Text content
    pub text: String,
}

/// A retrieved chunk with its similarity score (higher is better).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Options for the learn operation.
#[derive(Debug, Clone)]
pub struct LearnOptions {
    /// Knowledge base name
    pub base_name: String,

    /// Files or directories to learn from
    pub paths: Vec<PathBuf>,

    /// Reset the base before learning
    pub reset: bool,
}

/// Where `ask` and `chat` get their documents from.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    /// Persisted knowledge base to query
    pub base_name: Option<String>,

    /// Files to index into a fresh in-memory index
    pub files: Vec<PathBuf>,

    /// Chunks to retrieve (config value when unset)
    pub top_k: Option<usize>,
}

/// Statistics from a learn operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnStats {
    /// Number of documents indexed
    pub sources_count: u32,

    /// Number of pages extracted
    pub pages_count: u32,

    /// Number of chunks created
    pub chunks_count: u32,

    /// Total bytes read
    pub bytes_processed: u64,

    /// Documents that were skipped
    pub skipped: Vec<SkippedDocument>,

    /// Duration in seconds
    pub duration_secs: f64,
}

/// Statistics for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStats {
    /// Base name
    pub base_name: String,

    /// Number of documents
    pub sources_count: u32,

    /// Number of chunks
    pub chunks_count: u32,

    /// Database size in bytes
    pub db_size_bytes: u64,

    /// Embedding provider the index was built with
    pub provider: String,

    /// Embedding model the index was built with
    pub model: String,

    /// Vector dimensionality
    pub dimensions: usize,

    /// Similarity metric
    pub metric: Metric,

    /// Last learn timestamp
    pub last_learn_at: Option<DateTime<Utc>>,
}
