//! Knowledge command handler.
//!
//! Handles persisted knowledge base management.

use clap::{Args, Subcommand};
use drugsearch_core::{config::AppConfig, AppError, AppResult};
use drugsearch_knowledge::LearnOptions;
use serde::Serialize;
use std::path::PathBuf;

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Extract, chunk and embed documents into a base
    Learn(KnowledgeLearnCommand),
    /// Clean up knowledge base
    Clean(KnowledgeCleanCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
}

/// Learn from documents
#[derive(Args, Debug)]
pub struct KnowledgeLearnCommand {
    /// Knowledge base name
    pub base: String,

    /// Files or directories to learn from
    #[arg(long, required = true)]
    pub path: Vec<PathBuf>,

    /// Reset base before learning
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Knowledge(format!("JSON serialization failed: {}", e)))?;
    println!("{}", output);
    Ok(())
}

impl KnowledgeLearnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge learn command for base '{}'", self.base);

        let options = LearnOptions {
            base_name: self.base.clone(),
            paths: self.path.clone(),
            reset: self.reset,
        };

        let api_key = config.resolve_api_key("openai");

        let stats =
            drugsearch_knowledge::learn(&config.workspace, options, api_key.as_deref()).await?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!(
                "Learned {} sources ({} pages, {} chunks, {} bytes) in {:.2}s",
                stats.sources_count,
                stats.pages_count,
                stats.chunks_count,
                stats.bytes_processed,
                stats.duration_secs
            );
            for skipped in &stats.skipped {
                println!("  skipped {}: {}", skipped.name, skipped.reason);
            }
        }

        Ok(())
    }
}

/// Clean knowledge base
#[derive(Args, Debug)]
pub struct KnowledgeCleanCommand {
    /// Knowledge base name
    pub base: String,
}

impl KnowledgeCleanCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge clean command for base '{}'", self.base);

        drugsearch_knowledge::clean(&config.workspace, &self.base)?;

        println!("Knowledge base '{}' cleaned", self.base);

        Ok(())
    }
}

/// Show knowledge base stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Knowledge base name
    pub base: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing knowledge stats command for base '{}'", self.base);

        let stats = drugsearch_knowledge::stats(&config.workspace, &self.base)?;

        if self.json {
            print_json(&stats)?;
        } else {
            println!("Knowledge base: {}", stats.base_name);
            println!("  Sources: {}", stats.sources_count);
            println!("  Chunks: {}", stats.chunks_count);
            println!(
                "  Embeddings: {}/{} ({} dims, {})",
                stats.provider,
                stats.model,
                stats.dimensions,
                stats.metric.as_str()
            );
            println!("  DB size: {} bytes", stats.db_size_bytes);
            if let Some(last_learn) = stats.last_learn_at {
                println!("  Last learn: {}", last_learn);
            }
        }

        Ok(())
    }
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        match &self.action {
            KnowledgeAction::Learn(cmd) => cmd.execute(config).await,
            KnowledgeAction::Clean(cmd) => cmd.execute(config),
            KnowledgeAction::Stats(cmd) => cmd.execute(config),
        }
    }
}
