//! Embedding configuration types.

use serde::{Deserialize, Serialize};

/// Embedding configuration for a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "openai", "ollama", "trigram"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Custom endpoint (provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "text-embedding-ada-002".to_string(),
            dimensions: 1536,
            endpoint: None,
        }
    }
}

impl EmbeddingConfig {
    /// Local sentence-transformer model served by Ollama (all-MiniLM-L6-v2).
    pub fn ollama_minilm() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "all-minilm".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }

    /// Offline hashing embedder.
    pub fn trigram(dimensions: usize) -> Self {
        Self {
            provider: "trigram".to_string(),
            model: "trigram-v1".to_string(),
            dimensions,
            endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "text-embedding-ada-002");
        assert_eq!(config.dimensions, 1536);
    }

    #[test]
    fn test_endpoint_is_optional_in_yaml() {
        let config: EmbeddingConfig =
            serde_yaml::from_str("provider: ollama\nmodel: all-minilm\ndimensions: 384\n").unwrap();
        assert_eq!(config, EmbeddingConfig::ollama_minilm());

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("endpoint"));
    }
}
