use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{EvaluatorError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Image {
            source: ImageSource {
                kind: "base64".to_string(),
                media_type: media_type.into(),
                data: data.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ResponseBlock>,
    pub stop_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Bounded exponential backoff for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retrying after the given 1-based attempt failed.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

enum CallError {
    Transient(String),
    Fatal(EvaluatorError),
}

/// Client for the Anthropic Messages API
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl AnthropicClient {
    /// # Arguments
    /// * `base_url` - API root without the version path (e.g., "https://api.anthropic.com")
    /// * `api_key` - Value sent in the `x-api-key` header
    /// * `model` - Model name (e.g., "claude-3-5-sonnet-20241022")
    pub fn new(base_url: String, api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_tokens: 2000,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user turn and return the concatenated text of the reply.
    ///
    /// Transient failures are retried per the retry policy and surface as
    /// `JudgeUnavailable`; rejected credentials surface as `JudgeAuth` immediately.
    pub async fn generate(&self, system_prompt: &str, content: Vec<ContentBlock>) -> Result<String> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(system_prompt.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content,
            }],
            temperature: Some(0.0),
        };

        let images = request.messages[0]
            .content
            .iter()
            .filter(|block| matches!(block, ContentBlock::Image { .. }))
            .count();
        tracing::debug!(
            "Sending request to Anthropic (model: {}, images: {})",
            self.model,
            images
        );

        let attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.send_once(&request).await {
                Ok(text) => return Ok(text),
                Err(CallError::Fatal(e)) => return Err(e),
                Err(CallError::Transient(reason)) => {
                    tracing::warn!(
                        "Anthropic call attempt {}/{} failed: {}",
                        attempt,
                        attempts,
                        reason
                    );
                    last_error = reason;
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay_after(attempt)).await;
                    }
                }
            }
        }

        Err(EvaluatorError::JudgeUnavailable(format!(
            "{} (after {} attempts)",
            last_error, attempts
        )))
    }

    async fn send_once(&self, request: &MessagesRequest) -> std::result::Result<String, CallError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| CallError::Transient(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let reason = format!("Anthropic API error ({}): {}", status, error_text);
            return Err(classify_status(status, reason));
        }

        let body: MessagesResponse = response.json().await.map_err(|e| {
            CallError::Fatal(EvaluatorError::JudgeFormat(format!(
                "Failed to parse Anthropic response: {}",
                e
            )))
        })?;

        if let Some(usage) = &body.usage {
            tracing::debug!(
                "Anthropic generation complete: {} input tokens, {} output tokens, stop reason {:?}",
                usage.input_tokens,
                usage.output_tokens,
                body.stop_reason
            );
        }

        let text: String = body
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(CallError::Fatal(EvaluatorError::JudgeFormat(
                "Anthropic response contained no text".to_string(),
            )));
        }
        Ok(text)
    }
}

fn classify_status(status: StatusCode, reason: String) -> CallError {
    match status.as_u16() {
        401 | 403 => CallError::Fatal(EvaluatorError::JudgeAuth(reason)),
        408 | 429 | 529 => CallError::Transient(reason),
        code if code >= 500 => CallError::Transient(reason),
        _ => CallError::Fatal(EvaluatorError::JudgeUnavailable(reason)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn client_for(server: &MockServer) -> AnthropicClient {
        AnthropicClient::new(
            server.uri(),
            "test-key".to_string(),
            "claude-test".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_retry(fast_retry())
    }

    fn text_reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": text}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }))
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
    }

    #[test]
    fn test_image_block_serialization() {
        let block = ContentBlock::image("image/jpeg", "QUJD");
        assert_eq!(
            serde_json::to_value(&block).unwrap(),
            json!({"type": "image", "source": {"type": "base64", "media_type": "image/jpeg", "data": "QUJD"}})
        );
    }

    #[tokio::test]
    async fn test_generate_sends_headers_and_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(text_reply("{\"winner\": \"A\"}"))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server)
            .generate("system", vec![ContentBlock::text("hello")])
            .await
            .unwrap();
        assert_eq!(text, "{\"winner\": \"A\"}");
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(text_reply("ok"))
            .mount(&server)
            .await;

        let text = client_for(&server)
            .generate("system", vec![ContentBlock::text("hello")])
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_persistent_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("system", vec![ContentBlock::text("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluatorError::JudgeUnavailable(_)));
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("system", vec![ContentBlock::text("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluatorError::JudgeAuth(_)));
        assert!(err.is_fatal_for_run());
    }

    #[tokio::test]
    async fn test_bad_request_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("system", vec![ContentBlock::text("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluatorError::JudgeUnavailable(_)));
    }

    #[tokio::test]
    async fn test_empty_reply_is_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate("system", vec![ContentBlock::text("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluatorError::JudgeFormat(_)));
    }
}
