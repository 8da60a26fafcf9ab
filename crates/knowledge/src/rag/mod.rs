//! RAG (Retrieval-Augmented Generation) answering system.
//!
//! Retrieves the chunks closest to a question and asks the chat model to
//! answer from them alone.

pub mod ask;
pub mod pipeline;
pub mod types;

pub use ask::build_pipeline;
pub use pipeline::{build_context, collect_sources, RagPipeline};
pub use types::RagResponse;
