//! RAG response types.

use crate::types::ScoredChunk;
use serde::{Deserialize, Serialize};

/// Response from a RAG answering query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// Answer text from the chat model
    pub answer: String,

    /// Source labels of the retrieved chunks, in rank order, without repeats
    pub sources: Vec<String>,

    /// Chunks the answer was conditioned on
    #[serde(skip)]
    pub chunks: Vec<ScoredChunk>,
}

impl RagResponse {
    /// Highest retrieval score, if anything was retrieved.
    pub fn max_score(&self) -> Option<f32> {
        self.chunks.first().map(|c| c.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    #[test]
    fn test_serialized_response_hides_chunks() {
        let response = RagResponse {
            answer: "By injection.".to_string(),
            sources: vec!["exenatide.txt".to_string()],
            chunks: vec![ScoredChunk {
                chunk: Chunk {
                    id: "1".to_string(),
                    source: "exenatide.txt".to_string(),
                    position: 0,
                    text: "Exenatide is administered by injection.".to_string(),
                },
                score: 0.8,
            }],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"answer": "By injection.", "sources": ["exenatide.txt"]})
        );
        assert_eq!(response.max_score(), Some(0.8));
    }
}
