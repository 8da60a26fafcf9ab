//! Building a ready-to-ask pipeline from workspace state.

use crate::config;
use crate::embeddings::create_provider;
use crate::extract::{extract_documents, ExtractionReport, FileDocument, SourceDocument};
use crate::memory_index::InMemoryIndex;
use crate::rag::pipeline::RagPipeline;
use crate::sqlite_index::{IndexSignature, SqliteIndex};
use crate::types::AskOptions;
use drugsearch_core::{AppError, AppResult};
use drugsearch_llm::LlmClient;
use drugsearch_prompt::{load_prompt_or_default, RAG_ANSWER_PROMPT_ID};
use std::path::Path;
use std::sync::Arc;

/// Build the pipeline `ask` and `chat` run against.
///
/// With a base name the persisted SQLite index of that base is opened.
/// Otherwise the given files are extracted, chunked and embedded into a fresh
/// in-memory index using the workspace default knowledge config; files that
/// cannot be read are skipped and listed in the returned report.
pub async fn build_pipeline(
    workspace: &Path,
    options: &AskOptions,
    llm: Arc<dyn LlmClient>,
    model: &str,
    api_key: Option<&str>,
) -> AppResult<(RagPipeline, ExtractionReport)> {
    let prompt = load_prompt_or_default(workspace, RAG_ANSWER_PROMPT_ID)?;

    if let Some(base_name) = &options.base_name {
        let config = config::load_config(workspace, base_name)?;
        config.validate()?;

        let index_path = config::get_index_path(workspace, base_name);
        if !index_path.exists() {
            return Err(AppError::Knowledge(format!(
                "Knowledge base '{}' has no index. Run 'drugsearch knowledge learn {}' first.",
                base_name, base_name
            )));
        }

        let index = SqliteIndex::open(&index_path, &IndexSignature::from_config(&config))?;
        let embedder = create_provider(&config.embedding, api_key)?;

        tracing::info!("Opened knowledge base '{}'", base_name);

        let pipeline = RagPipeline::new(Box::new(index), embedder, llm, model)?
            .with_top_k(options.top_k.unwrap_or(config.top_k))
            .with_prompt(prompt);
        return Ok((pipeline, ExtractionReport::default()));
    }

    let config = config::load_default_config(workspace)?;
    config.validate()?;

    let index = InMemoryIndex::new(config.embedding.dimensions, config.metric)?;
    let embedder = create_provider(&config.embedding, api_key)?;

    let mut pipeline = RagPipeline::new(Box::new(index), embedder, llm, model)?
        .with_top_k(options.top_k.unwrap_or(config.top_k))
        .with_prompt(prompt);

    let documents: Vec<Box<dyn SourceDocument>> = options
        .files
        .iter()
        .map(|path| Box::new(FileDocument::new(path)) as Box<dyn SourceDocument>)
        .collect();
    let report = extract_documents(&documents);

    pipeline
        .index_pages(&report.pages, config.chunk_size, config.chunk_overlap)
        .await?;

    Ok((pipeline, report))
}
