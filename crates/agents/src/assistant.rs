//! General assistant agent. No collaborators, just the model.

use std::sync::Arc;

use async_trait::async_trait;
use quorum_common::{Agent, AgentMessage, Result};
use quorum_llm::{ChatMessage, ChatModel, ChatRequest};

const ASSISTANT_SYSTEM_PROMPT: &str =
    "你是一个通用智能助手，负责回答问题、执行一般性任务并协助协调工作。回答应简洁、准确。";

pub struct AssistantAgent {
    name: String,
    model: Arc<dyn ChatModel>,
    system_prompt: String,
}

impl AssistantAgent {
    pub fn new(name: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.into(),
            model,
            system_prompt: ASSISTANT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

#[async_trait]
impl Agent for AssistantAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> &'static str {
        "assistant"
    }

    async fn handle(&self, message: &AgentMessage) -> Result<AgentMessage> {
        let request = ChatRequest {
            system_prompt: Some(self.system_prompt.clone()),
            messages: vec![ChatMessage::user(&message.content)],
            temperature: Some(0.7),
            max_tokens: None,
        };
        let reply = self.model.complete(request).await?;
        Ok(AgentMessage::from_agent(&self.name, reply.content))
    }
}
