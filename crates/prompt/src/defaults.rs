//! Built-in prompt definitions.

use crate::types::PromptDefinition;

/// Identifier of the retrieval-augmented answering prompt.
pub const RAG_ANSWER_PROMPT_ID: &str = "rag.answer.default";

const RAG_ANSWER_SYSTEM: &str = "You are a helpful expert assistant. \
You will be shown the user's question, and the relevant information from the instructions. \
Answer the user's question using only this information.";

const RAG_ANSWER_TEMPLATE: &str = "Question: {{question}}. \n Information: {{information}}";

/// The default answering prompt: a fixed system instruction restricting the
/// model to the supplied information, and a user message carrying the
/// question and the retrieved context.
pub fn rag_answer_prompt() -> PromptDefinition {
    PromptDefinition {
        id: RAG_ANSWER_PROMPT_ID.to_string(),
        title: "Answer from retrieved drug information".to_string(),
        api_version: "1.0".to_string(),
        created_by: "drugsearch".to_string(),
        system: Some(RAG_ANSWER_SYSTEM.to_string()),
        template: RAG_ANSWER_TEMPLATE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_answer_prompt_restricts_to_information() {
        let def = rag_answer_prompt();
        assert_eq!(def.id, RAG_ANSWER_PROMPT_ID);
        assert!(def
            .system
            .as_deref()
            .unwrap()
            .ends_with("using only this information."));
        assert!(def.template.contains("{{question}}"));
        assert!(def.template.contains("{{information}}"));
    }
}
