//! Chat command handler.
//!
//! A line-oriented session: every line is a question, answered against the
//! same pipeline with the transcript kept for the life of the process.

use super::open_pipeline;
use clap::Args;
use drugsearch_core::{config::AppConfig, AppError, AppResult};
use drugsearch_knowledge::{AskOptions, ChatSession};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive question-and-answer session
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Document to index for the session (repeatable)
    #[arg(short, long = "file", conflicts_with = "base")]
    pub files: Vec<PathBuf>,

    /// Learned knowledge base to query
    #[arg(short, long)]
    pub base: Option<String>,

    /// Number of chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
}

enum Input<'a> {
    Question(&'a str),
    Clear,
    History,
    Exit,
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "/exit" | "/quit" => Input::Exit,
        "/clear" => Input::Clear,
        "/history" => Input::History,
        question => Input::Question(question),
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let options = AskOptions {
            base_name: self.base.clone(),
            files: self.files.clone(),
            top_k: self.top_k,
        };
        let (pipeline, report) = open_pipeline(config, &options).await?;
        let mut session = ChatSession::new(pipeline);

        if self.base.is_none() {
            println!("Indexed {} pages.", report.pages.len());
        }
        println!("Ask a question. /history shows the transcript, /clear resets it, /exit quits.");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };

            match parse_input(&line) {
                Input::Empty => continue,
                Input::Exit => break,
                Input::Clear => {
                    session.clear();
                    println!("History cleared.");
                }
                Input::History => println!("{}", session.transcript()),
                Input::Question(question) => match session.ask(question).await {
                    Ok(turn) => {
                        println!("{}", turn.content);
                        if !turn.sources.is_empty() {
                            println!("Sources: {}", turn.sources.join(", "));
                        }
                    }
                    Err(AppError::NoDocuments) => {
                        println!("No documents are indexed. Restart with --file or --base.");
                    }
                    Err(e) => return Err(e),
                },
            }
        }

        tracing::info!(session = %session.id(), turns = session.history().len(), "Chat ended");
        Ok(())
    }
}
