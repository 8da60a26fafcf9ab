//! Embedding providers for knowledge bases.
//!
//! One index uses exactly one provider; every provider checks the vectors it
//! returns against its configured dimensionality.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use crate::types::Chunk;
use drugsearch_core::{AppError, AppResult};

/// Embed chunk texts, returning one vector per chunk.
pub async fn embed_chunks(
    provider: &dyn EmbeddingProvider,
    chunks: &[Chunk],
) -> AppResult<Vec<Vec<f32>>> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        "Embedding {} chunks using provider '{}' (model: {})",
        chunks.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = provider.embed_batch(&texts).await?;

    if embeddings.len() != chunks.len() {
        return Err(AppError::Embedding(format!(
            "Provider returned {} embeddings for {} chunks",
            embeddings.len(),
            chunks.len()
        )));
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        embeddings.len(),
        provider.dimensions()
    );

    Ok(embeddings)
}
