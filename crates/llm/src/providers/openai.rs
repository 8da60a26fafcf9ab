//! OpenAI chat-completion provider.
//!
//! Talks to any OpenAI-compatible `/v1/chat/completions` endpoint.

use crate::client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use crate::types::ProviderType;
use drugsearch_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

/// OpenAI chat-completion request format.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// OpenAI chat-completion response format.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// OpenAI chat-completion client.
pub struct OpenAiClient {
    /// Base URL (without the `/v1/...` path)
    base_url: String,

    /// Bearer token
    api_key: String,

    /// HTTP client
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Create a client for the public OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(ProviderType::OpenAI.default_endpoint(), api_key)
    }

    /// Create a client for an OpenAI-compatible endpoint.
    pub fn with_base_url(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn to_openai_request(&self, request: &LlmRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn convert_response(&self, response: ChatCompletionResponse) -> AppResult<LlmResponse> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Llm("OpenAI response contained no choices".to_string()))?;

        let usage = response
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: response.model,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        ProviderType::OpenAI.as_str()
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        tracing::info!("Sending chat completion request to OpenAI");
        tracing::debug!("Request: {:?}", request);

        let body = self.to_openai_request(request);
        let url = format!("{}{}", self.base_url, CHAT_COMPLETIONS_PATH);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(AppError::Llm(format!(
                "OpenAI API error ({}): {}",
                status, detail
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse OpenAI response: {}", e)))?;

        tracing::info!("Received completion from OpenAI");
        tracing::debug!("Response: {:?}", parsed);

        self.convert_response(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ChatRole;

    #[test]
    fn test_openai_client_creation() {
        let client = OpenAiClient::with_base_url("http://localhost:8080/", "sk-test");
        assert_eq!(client.provider_name(), "openai");
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_request_conversion_builds_two_messages() {
        let client = OpenAiClient::new("sk-test");
        let request = LlmRequest::new("Question: dose?", "gpt-3.5-turbo")
            .with_system("Use only the information.")
            .with_temperature(0.0);

        let body = client.to_openai_request(&request);
        assert_eq!(body.model, "gpt-3.5-turbo");
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, ChatRole::System);
        assert_eq!(body.messages[1].content, "Question: dose?");

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_convert_response_takes_first_choice() {
        let client = OpenAiClient::new("sk-test");
        let raw = r#"{
            "model": "gpt-3.5-turbo-0125",
            "choices": [
                {"message": {"role": "assistant", "content": "By subcutaneous injection."}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 50, "completion_tokens": 6, "total_tokens": 56}
        }"#;

        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        let response = client.convert_response(parsed).unwrap();
        assert_eq!(response.content, "By subcutaneous injection.");
        assert_eq!(response.usage.total_tokens, 56);
    }

    #[test]
    fn test_convert_response_without_choices_fails() {
        let client = OpenAiClient::new("sk-test");
        let parsed: ChatCompletionResponse =
            serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        assert!(client.convert_response(parsed).is_err());
    }
}
