use async_trait::async_trait;
use std::time::Duration;

use super::{Evidence, Judge, JudgingContext, Verdict, parse_verdict};
use crate::Result;
use crate::frames::sampling::select_evenly;
use crate::llm::{AnthropicClient, ContentBlock, PromptBuilder, RetryPolicy};

#[derive(Debug, Clone)]
pub struct JudgeConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Frames sent per submission; a larger evidence set is thinned evenly.
    pub frames_per_side: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 2000,
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            frames_per_side: 4,
        }
    }
}

/// Pairwise judge backed by a multimodal LLM.
pub struct JudgeClient {
    llm: AnthropicClient,
    frames_per_side: usize,
}

impl JudgeClient {
    pub fn new(config: &JudgeConfig) -> Result<Self> {
        let llm = AnthropicClient::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
            config.timeout,
        )?
        .with_max_tokens(config.max_tokens)
        .with_retry(config.retry);

        Ok(Self {
            llm,
            frames_per_side: config.frames_per_side.max(1),
        })
    }

    fn side_blocks(&self, label: char, evidence: &Evidence, blocks: &mut Vec<ContentBlock>) {
        let images = select_evenly(&evidence.images, self.frames_per_side);
        blocks.push(ContentBlock::text(PromptBuilder::submission_label(label, images.len())));
        blocks.extend(
            images
                .into_iter()
                .map(|image| ContentBlock::image(image.media_type, image.data)),
        );
    }
}

#[async_trait]
impl Judge for JudgeClient {
    async fn compare(&self, context: &JudgingContext, a: &Evidence, b: &Evidence) -> Result<Verdict> {
        let mut blocks = vec![ContentBlock::text(PromptBuilder::comparison_intro(
            &context.task_description,
            &context.criteria,
        ))];
        self.side_blocks('A', a, &mut blocks);
        self.side_blocks('B', b, &mut blocks);

        let reply = self
            .llm
            .generate(&PromptBuilder::comparison_system_prompt(), blocks)
            .await?;

        let verdict = parse_verdict(&reply)?;
        tracing::debug!(
            "Judge verdict {:?} for {} vs {}",
            verdict.winner,
            a.submission_id,
            b.submission_id
        );
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EvaluatorError;
    use crate::judge::{EncodedImage, Winner};
    use serde_json::{Value, json};
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> JudgeConfig {
        JudgeConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
            },
            ..Default::default()
        }
    }

    fn evidence(frames: usize) -> Evidence {
        Evidence {
            submission_id: Uuid::new_v4(),
            images: (0..frames)
                .map(|i| EncodedImage {
                    media_type: "image/jpeg".to_string(),
                    data: format!("frame{}", i),
                })
                .collect(),
        }
    }

    fn context() -> JudgingContext {
        JudgingContext {
            task_description: "Build a kanban board".to_string(),
            criteria: vec!["Drag and drop".to_string()],
        }
    }

    fn reply(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": text}]
        }))
    }

    #[tokio::test]
    async fn test_compare_caps_frames_per_side() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(reply(r#"{"winner": "A", "rationale": "Columns are draggable"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let judge = JudgeClient::new(&config_for(&server)).unwrap();
        let verdict = judge.compare(&context(), &evidence(8), &evidence(2)).await.unwrap();
        assert_eq!(verdict.winner, Winner::A);

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let images = body["messages"][0]["content"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|block| block["type"] == "image")
            .count();
        assert_eq!(images, 4 + 2);
        assert!(body["system"].as_str().unwrap().contains("technical depth"));
    }

    #[tokio::test]
    async fn test_compare_malformed_reply_is_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(reply("Both submissions look great!"))
            .mount(&server)
            .await;

        let judge = JudgeClient::new(&config_for(&server)).unwrap();
        let err = judge
            .compare(&context(), &evidence(1), &evidence(1))
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluatorError::JudgeFormat(_)));
    }

    #[tokio::test]
    #[ignore] // Needs ANTHROPIC_API_KEY and network access
    async fn test_live_provider_reachable() {
        let config = JudgeConfig {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            ..Default::default()
        };
        let judge = JudgeClient::new(&config).unwrap();
        let result = judge.compare(&context(), &evidence(0), &evidence(0)).await;
        assert!(!matches!(result, Err(EvaluatorError::JudgeAuth(_))));
    }
}
