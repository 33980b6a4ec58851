pub mod client;
pub mod config;
pub mod gemini;
pub mod openai;
pub mod retry;

pub use client::{ChatMessage, ChatModel, ChatReply, ChatRequest, Role, TokenUsage};
pub use config::{ModelConfig, build_chat_model};
pub use gemini::GeminiProxyClient;
pub use openai::OpenAiCompatClient;
pub use retry::{RetryConfig, RetryingModel};
