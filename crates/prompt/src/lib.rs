//! Prompt system for Drug Search.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions (system instruction + user template)
//! - Handlebars template rendering
//! - Built-in defaults that a workspace can override in `.drugsearch/prompts/`

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use defaults::{rag_answer_prompt, RAG_ANSWER_PROMPT_ID};
pub use loader::{load_prompt, load_prompt_or_default};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
