//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, PromptDefinition};
use drugsearch_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Renders the optional system template and the user template with the same
/// variables and returns a `BuiltPrompt` ready for LLM execution.
///
/// # Example
/// ```
/// use drugsearch_prompt::{build_prompt, rag_answer_prompt};
/// use std::collections::HashMap;
///
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "How is Exenatide administered?".to_string());
/// vars.insert("information".to_string(), "Exenatide is administered by injection.".to_string());
///
/// let built = build_prompt(&rag_answer_prompt(), vars).unwrap();
/// assert!(built.user.starts_with("Question: How is Exenatide administered?"));
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {}", definition.id);

    let handlebars = registry(definition)?;

    let system = if definition.system.is_some() {
        Some(render(&handlebars, "system", &variables)?)
    } else {
        None
    };
    let user = render(&handlebars, "user", &variables)?;

    Ok(BuiltPrompt::new(
        system,
        user,
        definition.id.clone(),
        variables,
    ))
}

/// Register the definition's templates in a fresh Handlebars registry.
fn registry(definition: &PromptDefinition) -> AppResult<Handlebars<'static>> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("user", &definition.template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    if let Some(ref system) = definition.system {
        handlebars
            .register_template_string("system", system)
            .map_err(|e| AppError::Prompt(format!("Failed to register system template: {}", e)))?;
    }

    Ok(handlebars)
}

fn render(
    handlebars: &Handlebars<'_>,
    name: &str,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    handlebars
        .render(name, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template '{}': {}", name, e)))
}
