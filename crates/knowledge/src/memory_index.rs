//! Ephemeral in-memory vector index, rebuilt for every batch of uploads.

use crate::types::{Chunk, ScoredChunk};
use crate::vector_index::{check_dimensions, rank, Metric, VectorIndex};
use drugsearch_core::{AppError, AppResult};
use std::collections::{HashMap, HashSet};

/// Brute-force index over chunks held in insertion order.
#[derive(Debug, Clone)]
pub struct InMemoryIndex {
    dimensions: usize,
    metric: Metric,
    entries: Vec<(Chunk, Vec<f32>)>,
    /// Chunk id -> position in `entries`
    positions: HashMap<String, usize>,
}

impl InMemoryIndex {
    pub fn new(dimensions: usize, metric: Metric) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Config(
                "Index dimensions must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            dimensions,
            metric,
            entries: Vec::new(),
            positions: HashMap::new(),
        })
    }
}

impl VectorIndex for InMemoryIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn upsert_chunk(&mut self, chunk: &Chunk, embedding: &[f32]) -> AppResult<()> {
        check_dimensions(self.dimensions, embedding)?;

        let entry = (chunk.clone(), embedding.to_vec());
        match self.positions.get(&chunk.id) {
            Some(&i) => self.entries[i] = entry,
            None => {
                self.positions.insert(chunk.id.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    fn search(&self, query_embedding: &[f32], top_k: usize) -> AppResult<Vec<ScoredChunk>> {
        check_dimensions(self.dimensions, query_embedding)?;

        let candidates = self
            .entries
            .iter()
            .map(|(chunk, embedding)| ScoredChunk {
                chunk: chunk.clone(),
                score: self.metric.score(query_embedding, embedding),
            })
            .collect();

        Ok(rank(candidates, top_k))
    }

    fn stats(&self) -> AppResult<(u32, u32)> {
        let sources: HashSet<&str> = self.entries.iter().map(|(c, _)| c.source.as_str()).collect();
        Ok((sources.len() as u32, self.entries.len() as u32))
    }

    fn reset(&mut self) -> AppResult<()> {
        self.entries.clear();
        self.positions.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, source: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            source: source.to_string(),
            position: 0,
            text: format!("text of {}", id),
        }
    }

    #[test]
    fn test_search_orders_by_similarity() {
        let mut index = InMemoryIndex::new(3, Metric::Cosine).unwrap();
        index.upsert_chunk(&chunk("far", "a.txt"), &[0.0, 1.0, 0.0]).unwrap();
        index.upsert_chunk(&chunk("near", "b.txt"), &[1.0, 0.1, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results[0].chunk.id, "near");
        assert_eq!(results[1].chunk.id, "far");
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn test_l2_prefers_smallest_distance() {
        let mut index = InMemoryIndex::new(2, Metric::L2).unwrap();
        index.upsert_chunk(&chunk("far", "a.txt"), &[10.0, 10.0]).unwrap();
        index.upsert_chunk(&chunk("near", "a.txt"), &[1.0, 1.0]).unwrap();

        let results = index.search(&[0.0, 0.0], 1).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "near");
        assert!(results[0].score < 0.0);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut index = InMemoryIndex::new(2, Metric::Cosine).unwrap();
        index.upsert_chunk(&chunk("a", "a.txt"), &[1.0, 0.0]).unwrap();
        index.upsert_chunk(&chunk("b", "a.txt"), &[1.0, 0.0]).unwrap();
        index.upsert_chunk(&chunk("a", "a.txt"), &[1.0, 0.0]).unwrap();

        assert_eq!(index.stats().unwrap(), (1, 2));
        // Tie: "a" was inserted first and keeps its slot
        let results = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(results[0].chunk.id, "a");
    }

    #[test]
    fn test_wrong_length_fails_fast() {
        let mut index = InMemoryIndex::new(3, Metric::Cosine).unwrap();
        assert!(matches!(
            index.upsert_chunk(&chunk("a", "a.txt"), &[1.0]),
            Err(AppError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.search(&[1.0, 0.0], 1),
            Err(AppError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_stats_and_reset() {
        let mut index = InMemoryIndex::new(2, Metric::Cosine).unwrap();
        index.upsert_chunk(&chunk("a", "x.pdf_page_0"), &[1.0, 0.0]).unwrap();
        index.upsert_chunk(&chunk("b", "x.pdf_page_0"), &[0.0, 1.0]).unwrap();
        index.upsert_chunk(&chunk("c", "x.pdf_page_1"), &[0.0, 1.0]).unwrap();

        assert_eq!(index.stats().unwrap(), (2, 3));

        index.reset().unwrap();
        assert_eq!(index.stats().unwrap(), (0, 0));
        assert!(index.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(InMemoryIndex::new(0, Metric::Cosine).is_err());
    }
}
