//! Email agent: request parsing, drafting, and delivery.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use quorum_common::{Agent, AgentMessage, QuorumError, Result};
use quorum_llm::{ChatMessage, ChatModel, ChatRequest};
use tracing::info;

use crate::mail::EmailTransport;

const EMAIL_SYSTEM_PROMPT: &str = "你是一个专业的邮件代理。请生成内容专业、结构清晰的商务邮件，\
根据收件人和场景选择合适的语气，确保主题行准确概括内容。";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailIntent {
    Send,
    Draft,
    Generate,
}

/// A parsed email request. Fields left empty were not stated explicitly
/// and get filled in by the model during generation.
#[derive(Debug, Clone)]
pub struct EmailRequest {
    pub intent: EmailIntent,
    pub subject: String,
    pub recipient: String,
    pub content: String,
    pub original: String,
}

impl EmailRequest {
    /// Intent comes from send/draft markers; structured fields come from
    /// labelled lines like `主题: ...` or `to: ...`.
    pub fn parse(request: &str) -> Self {
        let lower = request.to_lowercase();

        let intent = if lower.contains("发送") || lower.contains("send") {
            EmailIntent::Send
        } else if lower.contains("草稿") || lower.contains("draft") {
            EmailIntent::Draft
        } else {
            EmailIntent::Generate
        };

        let mut parsed = Self {
            intent,
            subject: String::new(),
            recipient: String::new(),
            content: String::new(),
            original: request.to_string(),
        };

        for line in request.lines() {
            let line = line.trim();
            if let Some(value) = strip_label(line, &["主题:", "标题:", "subject:"]) {
                parsed.subject = value.to_string();
            } else if let Some(value) = strip_label(line, &["收件人:", "发送给:", "to:"]) {
                parsed.recipient = value.to_string();
            } else if let Some(value) = strip_label(line, &["内容:", "content:"]) {
                parsed.content = value.to_string();
            }
        }

        parsed
    }
}

fn strip_label<'a>(line: &'a str, labels: &[&str]) -> Option<&'a str> {
    for label in labels {
        if let Some(rest) = line.strip_prefix(label) {
            return Some(rest.trim());
        }
    }
    None
}

#[derive(Debug, Clone)]
pub struct DraftEmail {
    pub subject: String,
    pub recipient: String,
    pub body: String,
}

pub struct EmailAgent {
    name: String,
    model: Arc<dyn ChatModel>,
    transport: Option<Arc<dyn EmailTransport>>,
    drafts: Mutex<HashMap<String, DraftEmail>>,
    emails_generated: AtomicU64,
    emails_sent: AtomicU64,
    drafts_created: AtomicU64,
}

impl EmailAgent {
    pub fn new(name: impl Into<String>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: name.into(),
            model,
            transport: None,
            drafts: Mutex::new(HashMap::new()),
            emails_generated: AtomicU64::new(0),
            emails_sent: AtomicU64::new(0),
            drafts_created: AtomicU64::new(0),
        }
    }

    pub fn with_transport(mut self, transport: Arc<dyn EmailTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn set_transport(&mut self, transport: Arc<dyn EmailTransport>) {
        self.transport = Some(transport);
    }

    pub fn emails_generated(&self) -> u64 {
        self.emails_generated.load(Ordering::Relaxed)
    }

    pub fn emails_sent(&self) -> u64 {
        self.emails_sent.load(Ordering::Relaxed)
    }

    pub fn drafts_created(&self) -> u64 {
        self.drafts_created.load(Ordering::Relaxed)
    }

    pub fn draft(&self, id: &str) -> Option<DraftEmail> {
        self.drafts.lock().ok()?.get(id).cloned()
    }

    async fn generate_body(&self, request: &EmailRequest) -> Result<String> {
        if !request.content.is_empty() {
            return Ok(request.content.clone());
        }

        let mut prompt = format!("请根据以下要求生成专业邮件正文：\n\n{}", request.original);
        if !request.recipient.is_empty() {
            prompt.push_str(&format!("\n\n收件人: {}", request.recipient));
        }
        if !request.subject.is_empty() {
            prompt.push_str(&format!("\n主题: {}", request.subject));
        }

        let chat = ChatRequest {
            system_prompt: Some(EMAIL_SYSTEM_PROMPT.to_string()),
            messages: vec![ChatMessage::user(prompt)],
            temperature: Some(0.5),
            max_tokens: None,
        };
        let reply = self.model.complete(chat).await?;
        self.emails_generated.fetch_add(1, Ordering::Relaxed);
        Ok(reply.content)
    }

    fn subject_or_default(request: &EmailRequest) -> String {
        if request.subject.is_empty() {
            "来自协调中心的邮件".to_string()
        } else {
            request.subject.clone()
        }
    }

    async fn handle_send(&self, request: &EmailRequest) -> Result<String> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| QuorumError::Email("No mail transport configured".to_string()))?;

        if request.recipient.is_empty() {
            return Err(QuorumError::Email("No recipient specified".to_string()));
        }

        let subject = Self::subject_or_default(request);
        let body = self.generate_body(request).await?;
        let message_id = transport.send(&request.recipient, &subject, &body).await?;
        self.emails_sent.fetch_add(1, Ordering::Relaxed);

        info!(agent = %self.name, message_id = %message_id, "Email sent");
        Ok(format!("邮件发送成功，消息ID: {message_id}"))
    }

    async fn handle_draft(&self, request: &EmailRequest) -> Result<String> {
        let body = self.generate_body(request).await?;
        let draft = DraftEmail {
            subject: Self::subject_or_default(request),
            recipient: request.recipient.clone(),
            body,
        };

        let draft_id = uuid::Uuid::new_v4().to_string();
        self.drafts
            .lock()
            .map_err(|_| QuorumError::Email("Draft store poisoned".to_string()))?
            .insert(draft_id.clone(), draft);
        self.drafts_created.fetch_add(1, Ordering::Relaxed);

        Ok(format!("邮件草稿已创建，草稿ID: {draft_id}"))
    }

    async fn handle_generate(&self, request: &EmailRequest) -> Result<String> {
        let body = self.generate_body(request).await?;
        Ok(format!(
            "**主题**: {}\n**收件人**: {}\n\n{}",
            Self::subject_or_default(request),
            if request.recipient.is_empty() {
                "[收件人]"
            } else {
                &request.recipient
            },
            body
        ))
    }
}

#[async_trait]
impl Agent for EmailAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> &'static str {
        "email"
    }

    async fn handle(&self, message: &AgentMessage) -> Result<AgentMessage> {
        let request = EmailRequest::parse(&message.content);

        let response = match request.intent {
            EmailIntent::Send => self.handle_send(&request).await?,
            EmailIntent::Draft => self.handle_draft(&request).await?,
            EmailIntent::Generate => self.handle_generate(&request).await?,
        };

        Ok(AgentMessage::from_agent(&self.name, response))
    }
}
