//! Prompt loader for YAML prompt definitions.

use crate::defaults::{rag_answer_prompt, RAG_ANSWER_PROMPT_ID};
use crate::types::PromptDefinition;
use drugsearch_core::config::STATE_DIR;
use drugsearch_core::{AppError, AppResult};
use std::path::{Path, PathBuf};

fn prompts_dir(workspace_path: &Path) -> PathBuf {
    workspace_path.join(STATE_DIR).join("prompts")
}

/// Locate `<id>.yaml` or `<id>.yml` in the prompts directory.
fn find_prompt_file(workspace_path: &Path, prompt_id: &str) -> Option<PathBuf> {
    let dir = prompts_dir(workspace_path);
    ["yaml", "yml"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", prompt_id, ext)))
        .find(|path| path.exists())
}

/// Load a prompt definition by ID from the workspace.
///
/// Searches `.drugsearch/prompts/<id>.yaml` (or `.yml`).
///
/// # Example
/// ```no_run
/// use drugsearch_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.answer.default")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = find_prompt_file(workspace_path, prompt_id).ok_or_else(|| {
        AppError::Prompt(format!(
            "Prompt file not found for '{}' in {:?}",
            prompt_id,
            prompts_dir(workspace_path)
        ))
    })?;

    tracing::debug!("Loading prompt from: {:?}", prompt_file);

    let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to read prompt file {:?}: {}",
            prompt_file, e
        ))
    })?;

    let definition: PromptDefinition = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Prompt(format!(
            "Failed to parse prompt YAML {:?}: {}",
            prompt_file, e
        ))
    })?;

    validate_prompt(&definition)?;

    tracing::info!("Loaded prompt: {} ({})", definition.id, definition.title);

    Ok(definition)
}

/// Load a workspace override if one exists, otherwise the built-in definition.
///
/// Only built-in IDs have a fallback; unknown IDs without a file are an error.
pub fn load_prompt_or_default(
    workspace_path: &Path,
    prompt_id: &str,
) -> AppResult<PromptDefinition> {
    if find_prompt_file(workspace_path, prompt_id).is_some() {
        return load_prompt(workspace_path, prompt_id);
    }

    match prompt_id {
        RAG_ANSWER_PROMPT_ID => Ok(rag_answer_prompt()),
        _ => load_prompt(workspace_path, prompt_id),
    }
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}
