//! Gemini access through an OpenAI-wire proxy.
//!
//! The proxy speaks the chat-completions wire format but handles
//! multi-message conversations poorly, so the whole exchange is flattened
//! into one user turn with labelled sections before sending.

use async_trait::async_trait;
use quorum_common::{QuorumError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::{ChatModel, ChatReply, ChatRequest, Role, TokenUsage};

#[derive(Serialize)]
struct ProxyRequest {
    model: String,
    messages: Vec<ProxyMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct ProxyMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ProxyResponse {
    choices: Vec<ProxyChoice>,
    #[serde(default)]
    model: Option<String>,
    usage: Option<ProxyUsage>,
}

#[derive(Deserialize)]
struct ProxyChoice {
    message: ProxyMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ProxyUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

pub struct GeminiProxyClient {
    base_url: String,
    model: String,
    api_key: String,
    http_client: reqwest::Client,
}

impl GeminiProxyClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuorumError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            http_client,
        })
    }

    /// Flatten system prompt and conversation into a single labelled prompt.
    fn flatten_conversation(request: &ChatRequest) -> String {
        let mut parts = Vec::new();
        if let Some(ref system) = request.system_prompt {
            parts.push(format!("系统指令: {system}"));
        }
        for msg in &request.messages {
            let label = match msg.role {
                Role::System => "系统指令",
                Role::User => "用户",
                Role::Assistant => "助手",
            };
            parts.push(format!("{label}: {}", msg.content));
        }
        parts.join("\n\n")
    }
}

#[async_trait]
impl ChatModel for GeminiProxyClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ProxyRequest {
            model: self.model.clone(),
            messages: vec![ProxyMessage {
                role: "user".to_string(),
                content: Self::flatten_conversation(&request),
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| QuorumError::model(format!("Gemini proxy request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = crate::openai::retry_after_ms(response.headers());
            let body_text = response.text().await.unwrap_or_default();
            return Err(QuorumError::Model {
                message: format!("Gemini proxy error {status}: {body_text}"),
                status: Some(status.as_u16()),
                retry_after_ms,
            });
        }

        let wire: ProxyResponse = response
            .json()
            .await
            .map_err(|e| QuorumError::model(format!("Failed to parse proxy response: {e}")))?;

        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| QuorumError::model("No choices in proxy response"))?;

        Ok(ChatReply {
            content: choice.message.content,
            model: wire.model.unwrap_or_else(|| self.model.clone()),
            usage: wire.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
