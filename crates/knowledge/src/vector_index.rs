//! Vector index abstraction for knowledge chunks.
//!
//! Defines a trait for provider-agnostic vector storage and retrieval, the
//! similarity metrics it supports and the ranking shared by all backends.

use crate::types::{Chunk, ScoredChunk};
use drugsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Similarity metric used to rank chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine similarity, higher is closer
    #[default]
    Cosine,
    /// Euclidean distance, reported as its negation
    L2,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cosine" => Some(Self::Cosine),
            "l2" | "euclidean" => Some(Self::L2),
            _ => None,
        }
    }

    /// Score two vectors of equal length so that higher always means closer.
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::Cosine => cosine_similarity(a, b),
            Self::L2 => -l2_distance(a, b),
        }
    }
}

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Upserting chunks with embeddings
/// - Searching for similar vectors (top-k)
/// - Collecting statistics
/// - Resetting/clearing the index
///
/// Every vector passed in must have exactly `dimensions()` entries.
pub trait VectorIndex: Send + Sync {
    /// Vector length this index was created with.
    fn dimensions(&self) -> usize;

    /// Metric used by `search`.
    fn metric(&self) -> Metric;

    /// Insert or update a chunk with its embedding in the index.
    fn upsert_chunk(&mut self, chunk: &Chunk, embedding: &[f32]) -> AppResult<()>;

    /// Insert or update many chunks.
    fn upsert_chunks(&mut self, entries: &[(Chunk, Vec<f32>)]) -> AppResult<()> {
        for (chunk, embedding) in entries {
            self.upsert_chunk(chunk, embedding)?;
        }
        Ok(())
    }

    /// Search for the top-k most similar chunks to the query embedding.
    ///
    /// Returns chunks ordered by descending score; equal scores keep
    /// insertion order.
    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>>;

    /// Get statistics about the index.
    ///
    /// Returns (sources_count, chunks_count).
    fn stats(&self) -> AppResult<(u32, u32)>;

    /// Reset the index, removing all chunks and sources.
    fn reset(&mut self) -> AppResult<()>;
}

/// Fail fast when a vector does not match the index dimensionality.
pub fn check_dimensions(expected: usize, embedding: &[f32]) -> AppResult<()> {
    if embedding.len() != expected {
        return Err(AppError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

/// Sort scored chunks best-first and keep the top `k`.
///
/// The sort is stable, so candidates must arrive in insertion order.
pub fn rank(mut candidates: Vec<ScoredChunk>, top_k: usize) -> Vec<ScoredChunk> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates.truncate(top_k);
    candidates
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(id: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: id.to_string(),
                source: "doc.txt".to_string(),
                position: 0,
                text: id.to_string(),
            },
            score,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_l2_score_is_negated_distance() {
        let score = Metric::L2.score(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((score + 5.0).abs() < 0.001);
        assert_eq!(Metric::L2.score(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_rank_orders_best_first_and_keeps_ties_stable() {
        let ranked = rank(
            vec![scored("a", 0.5), scored("b", 0.9), scored("c", 0.5), scored("d", 0.1)],
            3,
        );
        let ids: Vec<&str> = ranked.iter().map(|s| s.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(3, &[0.0, 0.0, 0.0]).is_ok());
        match check_dimensions(3, &[0.0]) {
            Err(AppError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected dimension mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!(Metric::parse("Cosine"), Some(Metric::Cosine));
        assert_eq!(Metric::parse("euclidean"), Some(Metric::L2));
        assert_eq!(Metric::parse("dot"), None);
    }
}
