//! Chat-completion integration crate for Drug Search.
//!
//! This crate provides a provider-agnostic abstraction for sending a
//! system instruction plus a user message to a hosted or local chat model
//! and reading back the first choice's text.
//!
//! # Providers
//! - **OpenAI**: hosted `/v1/chat/completions` (default)
//! - **Ollama**: local `/api/chat`
//!
//! # Example
//! ```no_run
//! use drugsearch_llm::{LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("sk-...");
//! let request = LlmRequest::new("How is Exenatide administered?", "gpt-3.5-turbo")
//!     .with_system("Answer using only the supplied information.");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{ChatMessage, ChatRole, LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
