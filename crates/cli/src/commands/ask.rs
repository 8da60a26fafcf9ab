//! Ask command handler.
//!
//! Answers a single question from uploaded files or a learned knowledge base.

use super::open_pipeline;
use clap::Args;
use drugsearch_core::{config::AppConfig, AppError, AppResult};
use drugsearch_knowledge::AskOptions;
use std::path::PathBuf;

/// Ask one question about drug documents
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Document to index for this question (repeatable)
    #[arg(short, long = "file", conflicts_with = "base")]
    pub files: Vec<PathBuf>,

    /// Learned knowledge base to query
    #[arg(short, long)]
    pub base: Option<String>,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        if self.question.trim().is_empty() {
            return Err(AppError::Config("No question provided".to_string()));
        }

        let options = AskOptions {
            base_name: self.base.clone(),
            files: self.files.clone(),
            top_k: self.top_k,
        };
        let (pipeline, _) = open_pipeline(config, &options).await?;

        let response = pipeline.ask(&self.question).await?;

        tracing::debug!(
            max_score = ?response.max_score(),
            sources = response.sources.len(),
            "RAG response ready"
        );

        if self.json {
            let output = serde_json::to_string_pretty(&response).map_err(|e| {
                AppError::Knowledge(format!("JSON serialization failed: {}", e))
            })?;
            println!("{}", output);
        } else {
            println!("{}", response.answer);
            println!();
            println!("Sources: {}", response.sources.join(", "));
        }

        Ok(())
    }
}
