use std::sync::Arc;
use std::time::Duration;

use quorum_common::{QuorumError, Result};
use serde::{Deserialize, Serialize};

use crate::client::ChatModel;
use crate::gemini::GeminiProxyClient;
use crate::openai::OpenAiCompatClient;
use crate::retry::{RetryConfig, RetryingModel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_timeout_ms() -> u64 {
    30_000
}

pub fn build_chat_model(config: &ModelConfig) -> Result<Arc<dyn ChatModel>> {
    let timeout = Duration::from_millis(config.timeout_ms);

    let base_model: Box<dyn ChatModel> = match config.provider.as_str() {
        "openai" => Box::new(OpenAiCompatClient::new(
            config.api_url.clone(),
            config.model.clone(),
            config.api_key.clone(),
            timeout,
        )?),
        "gemini" => {
            let api_key = config
                .api_key
                .clone()
                .ok_or_else(|| QuorumError::Config("Gemini requires an API key".to_string()))?;
            let api_url = config
                .api_url
                .clone()
                .ok_or_else(|| QuorumError::Config("Gemini requires a proxy URL".to_string()))?;
            Box::new(GeminiProxyClient::new(
                api_url,
                config.model.clone(),
                api_key,
                timeout,
            )?)
        }
        other => {
            return Err(QuorumError::Config(format!(
                "Unknown model provider: {other}"
            )));
        }
    };

    Ok(Arc::new(RetryingModel::new(base_model, config.retry.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_CONFIG: &str = r#"
provider = "gemini"
model = "gemini-2.0-flash"
api_key = "test-key"
api_url = "http://localhost:8045"
timeout_ms = 45000

[retry]
max_retries = 5
initial_delay_ms = 1000
max_delay_ms = 60000
backoff_multiplier = 3.0
"#;

    #[test]
    fn deserialize_config_from_toml() {
        let config: ModelConfig = toml::from_str(TOML_CONFIG).unwrap();
        assert_eq!(config.provider, "gemini");
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.api_url.as_deref(), Some("http://localhost:8045"));
        assert_eq!(config.timeout_ms, 45_000);
        assert_eq!(config.retry.max_retries, 5);
    }

    #[test]
    fn deserialize_config_defaults() {
        let toml_str = r#"
provider = "openai"
model = "gpt-4o"
"#;
        let config: ModelConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_delay_ms, 500);
    }

    #[test]
    fn build_openai_model() {
        let config = ModelConfig {
            provider: "openai".to_string(),
            model: "llama3".to_string(),
            api_key: None,
            api_url: Some("http://localhost:11434".to_string()),
            temperature: None,
            max_tokens: None,
            timeout_ms: 30_000,
            retry: RetryConfig::default(),
        };
        let model = build_chat_model(&config).unwrap();
        assert_eq!(model.model_name(), "llama3");
    }

    #[test]
    fn build_gemini_model() {
        let config = ModelConfig {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: Some("test-key".to_string()),
            api_url: Some("http://localhost:8045".to_string()),
            temperature: None,
            max_tokens: None,
            timeout_ms: 30_000,
            retry: RetryConfig::default(),
        };
        let model = build_chat_model(&config).unwrap();
        assert_eq!(model.model_name(), "gemini-2.0-flash");
    }

    #[test]
    fn build_gemini_without_key_fails() {
        let config = ModelConfig {
            provider: "gemini".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key: None,
            api_url: Some("http://localhost:8045".to_string()),
            temperature: None,
            max_tokens: None,
            timeout_ms: 30_000,
            retry: RetryConfig::default(),
        };
        assert!(build_chat_model(&config).is_err());
    }

    #[test]
    fn build_unknown_provider_fails() {
        let config = ModelConfig {
            provider: "cohere".to_string(),
            model: "command-r".to_string(),
            api_key: None,
            api_url: None,
            temperature: None,
            max_tokens: None,
            timeout_ms: 30_000,
            retry: RetryConfig::default(),
        };
        assert!(build_chat_model(&config).is_err());
    }
}
