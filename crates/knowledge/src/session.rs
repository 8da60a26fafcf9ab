//! Interactive question-and-answer session.

use crate::rag::RagPipeline;
use drugsearch_core::AppResult;
use drugsearch_llm::ChatRole;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Assistant reply recorded when the chat model call fails.
pub const GENERATION_FAILED_MESSAGE: &str = "An error occurred. Please try a different question.";

/// One message in the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
    /// Source labels cited by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            sources,
        }
    }
}

/// A chat session owning its pipeline and an append-only history.
///
/// Questions are answered one at a time; the history lives exactly as long
/// as the session.
pub struct ChatSession {
    id: Uuid,
    pipeline: RagPipeline,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(pipeline: RagPipeline) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "Chat session started");
        Self {
            id,
            pipeline,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Record the question, answer it and record the answer.
    ///
    /// A failed chat model call is logged and answered with
    /// [`GENERATION_FAILED_MESSAGE`]. Retrieval failures (embedding errors,
    /// no documents) are returned to the caller; the question stays in the
    /// history either way.
    #[tracing::instrument(skip(self, question), fields(session = %self.id))]
    pub async fn ask(&mut self, question: &str) -> AppResult<&ChatTurn> {
        self.history.push(ChatTurn::user(question));

        let retrieved = self.pipeline.retrieve(question).await?;

        let turn = match self.pipeline.generate(question, retrieved).await {
            Ok(response) => ChatTurn::assistant(response.answer, response.sources),
            Err(e) => {
                tracing::error!("Answer generation failed: {}", e);
                ChatTurn::assistant(GENERATION_FAILED_MESSAGE, Vec::new())
            }
        };

        self.history.push(turn);
        Ok(&self.history[self.history.len() - 1])
    }

    /// Forget every turn.
    pub fn clear(&mut self) {
        tracing::debug!(session = %self.id, "Cleared {} turns", self.history.len());
        self.history.clear();
    }

    /// Render the history as plain text; empty when there is no history.
    pub fn transcript(&self) -> String {
        self.history
            .iter()
            .map(render_turn)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn render_turn(turn: &ChatTurn) -> String {
    let mut text = format!("{}: {}", turn.role.as_str(), turn.content);
    if !turn.sources.is_empty() {
        text.push_str(&format!("\nSources: {}", turn.sources.join(", ")));
    }
    text
}
