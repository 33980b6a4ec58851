//! Outbound mail delivery for the email agent.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use quorum_common::{QuorumError, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

/// A pluggable delivery backend. Returns the provider's message id.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String>;
}

const GMAIL_SEND_URL: &str = "https://gmail.googleapis.com/gmail/v1/users/me/messages/send";

#[derive(Deserialize)]
struct GmailSendResponse {
    id: String,
}

/// Sends through the Gmail REST API with a pre-obtained OAuth access token.
pub struct GmailTransport {
    access_token: String,
    send_url: String,
    http_client: reqwest::Client,
}

impl GmailTransport {
    pub fn new(access_token: String, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuorumError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            access_token,
            send_url: GMAIL_SEND_URL.to_string(),
            http_client,
        })
    }

    /// Gmail expects the whole RFC 2822 message, urlsafe-base64 encoded.
    fn encode_message(to: &str, subject: &str, body: &str) -> String {
        let raw = format!(
            "To: {to}\r\nSubject: {subject}\r\nContent-Type: text/plain; charset=\"utf-8\"\r\nMIME-Version: 1.0\r\n\r\n{body}"
        );
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }
}

#[async_trait]
impl EmailTransport for GmailTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<String> {
        let raw = Self::encode_message(to, subject, body);

        let response = self
            .http_client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| QuorumError::Email(format!("Mail send request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(QuorumError::Email(format!(
                "Mail send error {status}: {body_text}"
            )));
        }

        let sent: GmailSendResponse = response
            .json()
            .await
            .map_err(|e| QuorumError::Email(format!("Failed to parse send response: {e}")))?;

        Ok(sent.id)
    }
}
