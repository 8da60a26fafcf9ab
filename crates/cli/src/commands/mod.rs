//! Command handlers for the drugsearch CLI.

pub mod ask;
pub mod chat;
pub mod knowledge;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use knowledge::KnowledgeCommand;

use drugsearch_core::{config::AppConfig, AppResult};
use drugsearch_knowledge::{build_pipeline, AskOptions, ExtractionReport, RagPipeline};
use drugsearch_llm::create_client;

/// Create the chat client and build the pipeline for `ask` and `chat`.
pub(crate) async fn open_pipeline(
    config: &AppConfig,
    options: &AskOptions,
) -> AppResult<(RagPipeline, ExtractionReport)> {
    let llm_key = config.resolve_api_key(&config.provider);
    let llm = create_client(
        &config.provider,
        config.provider_endpoint(&config.provider),
        llm_key.as_deref(),
    )?;

    // Embedding providers that need a key always talk to OpenAI
    let embedding_key = config.resolve_api_key("openai");

    let (pipeline, report) = build_pipeline(
        &config.workspace,
        options,
        llm,
        &config.model,
        embedding_key.as_deref(),
    )
    .await?;

    for skipped in &report.skipped {
        eprintln!("Skipped {}: {}", skipped.name, skipped.reason);
    }

    Ok((pipeline, report))
}
