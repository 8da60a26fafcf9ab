//! Test doubles shared by the scenario tests.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::memory_index::InMemoryIndex;
use crate::rag::RagPipeline;
use crate::vector_index::Metric;
use drugsearch_core::{AppError, AppResult};
use drugsearch_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const DIMENSIONS: usize = 256;

/// Chat model that answers with the information block it was given.
#[derive(Debug, Default)]
pub struct EchoClient {
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<LlmRequest>>,
}

impl EchoClient {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LlmClient for EchoClient {
    fn provider_name(&self) -> &str {
        "echo"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());

        let information = request
            .prompt
            .split_once("Information: ")
            .map(|(_, info)| info)
            .unwrap_or_default();

        Ok(LlmResponse {
            content: format!("According to the label: {}", information),
            model: request.model.clone(),
            usage: LlmUsage::new(10, 10),
        })
    }
}

/// Chat model that always fails.
#[derive(Debug, Default)]
pub struct FailingClient;

#[async_trait::async_trait]
impl LlmClient for FailingClient {
    fn provider_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> AppResult<LlmResponse> {
        Err(AppError::Llm("service unavailable".to_string()))
    }
}

/// Trigram embedder that counts how many texts it embedded.
#[derive(Debug)]
pub struct CountingEmbedder {
    inner: TrigramProvider,
    pub embedded: AtomicUsize,
}

impl CountingEmbedder {
    pub fn new() -> Self {
        Self {
            inner: TrigramProvider::new(DIMENSIONS),
            embedded: AtomicUsize::new(0),
        }
    }

    pub fn embedded(&self) -> usize {
        self.embedded.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for CountingEmbedder {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }
}

/// Empty in-memory pipeline over the given chat model.
pub fn memory_pipeline(llm: Arc<dyn LlmClient>) -> RagPipeline {
    let index = InMemoryIndex::new(DIMENSIONS, Metric::Cosine).unwrap();
    RagPipeline::new(
        Box::new(index),
        Arc::new(TrigramProvider::new(DIMENSIONS)),
        llm,
        "gpt-3.5-turbo",
    )
    .unwrap()
}
