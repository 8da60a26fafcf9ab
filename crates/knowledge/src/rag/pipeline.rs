//! Retrieval and generation over one vector index.

use crate::chunker::chunk_pages;
use crate::embeddings::{embed_chunks, EmbeddingProvider};
use crate::rag::types::RagResponse;
use crate::types::{Chunk, ExtractedPage, ScoredChunk};
use crate::vector_index::VectorIndex;
use drugsearch_core::{AppError, AppResult};
use drugsearch_llm::{LlmClient, LlmRequest};
use drugsearch_prompt::{build_prompt, rag_answer_prompt, PromptDefinition};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// An index plus the embedder that fills it and the chat model that answers
/// from it.
pub struct RagPipeline {
    index: Box<dyn VectorIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmClient>,
    prompt: PromptDefinition,
    model: String,
    top_k: usize,
}

impl RagPipeline {
    /// Create a pipeline answering with `model`, retrieving one chunk per
    /// question and using the built-in answer prompt.
    ///
    /// # Errors
    /// Returns `AppError::DimensionMismatch` if the embedder and the index
    /// disagree on vector length.
    pub fn new(
        index: Box<dyn VectorIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> AppResult<Self> {
        if embedder.dimensions() != index.dimensions() {
            return Err(AppError::DimensionMismatch {
                expected: index.dimensions(),
                actual: embedder.dimensions(),
            });
        }

        Ok(Self {
            index,
            embedder,
            llm,
            prompt: rag_answer_prompt(),
            model: model.into(),
            top_k: 1,
        })
    }

    /// Set the number of chunks retrieved per question (at least 1).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Replace the answer prompt.
    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    /// Chunk, embed and index extracted pages. Returns the number of chunks added.
    pub async fn index_pages(
        &mut self,
        pages: &[ExtractedPage],
        chunk_size: usize,
        overlap: usize,
    ) -> AppResult<usize> {
        let chunks = chunk_pages(pages, chunk_size, overlap)?;
        let embeddings = embed_chunks(self.embedder.as_ref(), &chunks).await?;

        let entries: Vec<(Chunk, Vec<f32>)> = chunks.into_iter().zip(embeddings).collect();
        self.index.upsert_chunks(&entries)?;

        tracing::info!("Indexed {} chunks from {} page(s)", entries.len(), pages.len());
        Ok(entries.len())
    }

    /// Embed the question and fetch the top-k nearest chunks.
    ///
    /// # Errors
    /// Returns `AppError::NoDocuments` without embedding anything when the
    /// index is empty.
    pub async fn retrieve(&self, question: &str) -> AppResult<Vec<ScoredChunk>> {
        let (_, chunks_count) = self.index.stats()?;
        if chunks_count == 0 {
            return Err(AppError::NoDocuments);
        }

        let query_embedding = self.embedder.embed(question).await?;
        let results = self.index.search(&query_embedding, self.top_k)?;

        tracing::info!(
            "Retrieved {} chunks (top score: {:.3})",
            results.len(),
            results.first().map(|r| r.score).unwrap_or(0.0)
        );

        Ok(results)
    }

    /// Ask the chat model to answer from already retrieved chunks.
    pub async fn generate(
        &self,
        question: &str,
        retrieved: Vec<ScoredChunk>,
    ) -> AppResult<RagResponse> {
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert("information".to_string(), build_context(&retrieved));

        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, self.model.clone());
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        tracing::debug!(
            "Generating answer with provider '{}' (model: {})",
            self.llm.provider_name(),
            self.model
        );

        let response = self.llm.complete(&request).await?;

        Ok(RagResponse {
            answer: response.content,
            sources: collect_sources(&retrieved),
            chunks: retrieved,
        })
    }

    /// Retrieve, then generate.
    pub async fn ask(&self, question: &str) -> AppResult<RagResponse> {
        let retrieved = self.retrieve(question).await?;
        self.generate(question, retrieved).await
    }
}

/// Join chunk texts in rank order, separated by a blank line.
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Source labels in rank order, first occurrence wins.
pub fn collect_sources(chunks: &[ScoredChunk]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for scored in chunks {
        if seen.insert(scored.chunk.source.as_str()) {
            sources.push(scored.chunk.source.clone());
        }
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(source: &str, text: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: text.to_string(),
                source: source.to_string(),
                position: 0,
                text: text.to_string(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_build_context() {
        let context = build_context(&[scored("a.txt", "First chunk"), scored("b.txt", "Second chunk")]);
        assert_eq!(context, "First chunk\n\nSecond chunk");
    }

    #[test]
    fn test_build_context_empty() {
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_collect_sources_dedups_in_rank_order() {
        let sources = collect_sources(&[
            scored("label.pdf_page_2", "a"),
            scored("label.pdf_page_0", "b"),
            scored("label.pdf_page_2", "c"),
        ]);
        assert_eq!(sources, vec!["label.pdf_page_2", "label.pdf_page_0"]);
    }
}
