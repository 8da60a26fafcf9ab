//! Drug Search CLI
//!
//! Main entry point for the drugsearch command-line tool.
//! Answers questions about drug documents with retrieval-augmented generation.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, KnowledgeCommand};
use drugsearch_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Drug Search CLI - question answering over drug labels and leaflets
#[derive(Parser, Debug)]
#[command(name = "drugsearch")]
#[command(about = "Question answering over drug documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DRUGSEARCH_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DRUGSEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Chat provider (openai, ollama)
    #[arg(short, long, global = true, env = "DRUGSEARCH_PROVIDER")]
    provider: Option<String>,

    /// Chat model identifier
    #[arg(short, long, global = true, env = "DRUGSEARCH_MODEL")]
    model: Option<String>,

    /// API key for OpenAI chat and embeddings
    #[arg(long, global = true, env = "DRUGSEARCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask one question about documents or a knowledge base
    Ask(AskCommand),

    /// Interactive question-and-answer session
    Chat(ChatCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let config = AppConfig::load()?;

    let mut config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    if cli.api_key.is_some() {
        config.api_key = cli.api_key;
    }

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Drug Search CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_state_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Knowledge(_) => "knowledge",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = run(cli.command, &config).await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}

async fn run(command: Commands, config: &AppConfig) -> AppResult<()> {
    match command {
        Commands::Ask(cmd) => {
            config.validate()?;
            cmd.execute(config).await
        }
        Commands::Chat(cmd) => {
            config.validate()?;
            cmd.execute(config).await
        }
        Commands::Knowledge(cmd) => cmd.execute(config).await,
    }
}
