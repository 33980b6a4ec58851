//! Retry wrapper around a chat model.
//!
//! Only failures the provider explicitly signalled as transient are
//! retried: HTTP 429 and the 5xx range. Transport errors and malformed
//! reply bodies surface immediately since the request may never have
//! reached the provider at all. A Retry-After hint attached to the error
//! overrides the computed backoff.

use async_trait::async_trait;
use quorum_common::{QuorumError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::client::{ChatModel, ChatReply, ChatRequest};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

pub struct RetryingModel<T: ChatModel> {
    inner: T,
    config: RetryConfig,
}

impl<T: ChatModel> RetryingModel<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn is_retryable(error: &QuorumError) -> bool {
        match error {
            QuorumError::Model {
                status: Some(status),
                ..
            } => *status == 429 || (500..=599).contains(status),
            _ => false,
        }
    }

    fn retry_after(error: &QuorumError) -> Option<u64> {
        match error {
            QuorumError::Model { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    fn backoff_delay(&self, attempt: u32) -> u64 {
        let scaled = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        (scaled as u64).min(self.config.max_delay_ms)
    }
}

#[async_trait]
impl<T: ChatModel> ChatModel for RetryingModel<T> {
    async fn complete(&self, request: ChatRequest) -> Result<ChatReply> {
        let mut attempt = 0;
        loop {
            let error = match self.inner.complete(request.clone()).await {
                Ok(reply) => return Ok(reply),
                Err(e) => e,
            };

            if attempt >= self.config.max_retries || !Self::is_retryable(&error) {
                return Err(error);
            }

            let delay = Self::retry_after(&error).unwrap_or_else(|| self.backoff_delay(attempt));
            warn!(
                attempt = attempt + 1,
                max_retries = self.config.max_retries,
                delay_ms = delay,
                error = %error,
                "Retrying chat completion"
            );
            tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
            attempt += 1;
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn http_error(status: u16, retry_after_ms: Option<u64>) -> QuorumError {
        QuorumError::Model {
            message: format!("Chat completion error {status}"),
            status: Some(status),
            retry_after_ms,
        }
    }

    /// Fails the first `failures` calls with the given status, then
    /// succeeds. Retry delays stay at 1ms through the Retry-After hint.
    struct FlakyModel {
        calls: AtomicU32,
        failures: u32,
        status: u16,
    }

    impl FlakyModel {
        fn new(failures: u32, status: u16) -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures,
                status,
            }
        }
    }

    #[async_trait]
    impl ChatModel for FlakyModel {
        async fn complete(&self, _request: ChatRequest) -> Result<ChatReply> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(http_error(self.status, Some(1)));
            }
            Ok(ChatReply {
                content: "ok".to_string(),
                model: "flaky".to_string(),
                usage: None,
                finish_reason: None,
            })
        }
        fn model_name(&self) -> &str {
            "flaky"
        }
    }

    #[test]
    fn default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn only_throttling_and_server_statuses_are_retryable() {
        assert!(RetryingModel::<FlakyModel>::is_retryable(&http_error(
            429, None
        )));
        assert!(RetryingModel::<FlakyModel>::is_retryable(&http_error(
            503, None
        )));
        assert!(!RetryingModel::<FlakyModel>::is_retryable(&http_error(
            401, None
        )));
        assert!(!RetryingModel::<FlakyModel>::is_retryable(&http_error(
            400, None
        )));
        // No HTTP status means the provider never answered coherently.
        assert!(!RetryingModel::<FlakyModel>::is_retryable(
            &QuorumError::model("connection refused")
        ));
        assert!(!RetryingModel::<FlakyModel>::is_retryable(
            &QuorumError::Routing("not a model error".to_string())
        ));
    }

    #[test]
    fn retry_after_hint_is_read_from_the_error() {
        assert_eq!(
            RetryingModel::<FlakyModel>::retry_after(&http_error(429, Some(5000))),
            Some(5000)
        );
        assert_eq!(
            RetryingModel::<FlakyModel>::retry_after(&http_error(503, None)),
            None
        );
    }

    #[test]
    fn backoff_grows_and_caps_at_max_delay() {
        let model = RetryingModel::new(
            FlakyModel::new(0, 503),
            RetryConfig {
                max_retries: 5,
                initial_delay_ms: 500,
                max_delay_ms: 3000,
                backoff_multiplier: 2.0,
            },
        );
        assert_eq!(model.backoff_delay(0), 500);
        assert_eq!(model.backoff_delay(1), 1000);
        assert_eq!(model.backoff_delay(2), 2000);
        assert_eq!(model.backoff_delay(3), 3000);
        assert_eq!(model.backoff_delay(10), 3000);
    }

    #[tokio::test]
    async fn recovers_after_transient_server_errors() {
        let model = RetryingModel::new(FlakyModel::new(2, 503), RetryConfig::default());

        let reply = model.complete(ChatRequest::default()).await.unwrap();
        assert_eq!(reply.content, "ok");
        assert_eq!(model.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let model = RetryingModel::new(
            FlakyModel::new(u32::MAX, 429),
            RetryConfig {
                max_retries: 2,
                ..RetryConfig::default()
            },
        );

        let err = model.complete(ChatRequest::default()).await.unwrap_err();
        assert!(matches!(
            err,
            QuorumError::Model {
                status: Some(429),
                ..
            }
        ));
        assert_eq!(model.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let model = RetryingModel::new(FlakyModel::new(u32::MAX, 401), RetryConfig::default());

        assert!(model.complete(ChatRequest::default()).await.is_err());
        assert_eq!(model.inner.calls.load(Ordering::SeqCst), 1);
    }
}
