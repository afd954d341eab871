use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use storage::dto::criteria::GeneratedCriteriaResponse;

use crate::llm::{AnthropicClient, ContentBlock, PromptBuilder};

const MAX_CRITERIA: usize = 6;
const MIN_CRITERION_LEN: usize = 10;
const MAX_BULLET_LEN: usize = 150;
const MAX_REDACTIONS: usize = 2;
const REDACTED: &str = "[REDACTED]";

lazy_static! {
    static ref SENSITIVE_PATTERNS: Vec<Regex> = vec![
        // email addresses
        Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").unwrap(),
        // phone numbers
        Regex::new(r"\b\d{3}-\d{3}-\d{4}\b").unwrap(),
        Regex::new(r"\b\d{3}\.\d{3}\.\d{4}\b").unwrap(),
        Regex::new(r"\(\d{3}\)\s*\d{3}-\d{4}").unwrap(),
        // company names
        Regex::new(r"(?i)\b[a-z]+ (?:inc|llc|corp|ltd|company)\b").unwrap(),
        Regex::new(r"(?i)\b(?:confidential|proprietary|internal)\b").unwrap(),
    ];
    static ref LIST_MARKER: Regex = Regex::new(r"^(?:\d+[.)]|[-*•])\s*").unwrap();
}

const GENERIC_REPLACEMENTS: &[(&str, &str)] = &[
    ("our company", "the organization"),
    ("our client", "the client"),
    ("our team", "the team"),
    ("our product", "the product"),
    ("our system", "the system"),
    ("our platform", "the platform"),
];

/// Generates evaluation criteria from a job posting, falling back to role defaults.
pub struct CriteriaProcessor {
    llm: Option<Arc<AnthropicClient>>,
}

impl CriteriaProcessor {
    pub fn new(llm: Arc<AnthropicClient>) -> Self {
        Self { llm: Some(llm) }
    }

    /// A processor that always answers with the role defaults.
    pub fn offline() -> Self {
        Self { llm: None }
    }

    pub async fn generate(
        &self,
        job_title: &str,
        job_description: &str,
        example_task: &str,
    ) -> GeneratedCriteriaResponse {
        let Some(llm) = &self.llm else {
            return fallback_response(job_title);
        };

        let prompt = PromptBuilder::criteria_user_prompt(job_title, job_description, example_task);
        let reply = match llm
            .generate(
                &PromptBuilder::criteria_system_prompt(),
                vec![ContentBlock::text(prompt)],
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!("Criteria generation failed, using defaults for '{}': {}", job_title, e);
                return fallback_response(job_title);
            }
        };

        let criteria = filter_sensitive(&parse_criteria_response(&reply));
        if criteria.is_empty() {
            tracing::warn!("Criteria reply had no usable entries, using defaults for '{}'", job_title);
            return fallback_response(job_title);
        }

        GeneratedCriteriaResponse {
            criteria,
            fallback_used: false,
        }
    }
}

fn fallback_response(job_title: &str) -> GeneratedCriteriaResponse {
    GeneratedCriteriaResponse {
        criteria: fallback_criteria(job_title),
        fallback_used: true,
    }
}

/// Reads a JSON array of strings out of the reply, or failing that, its bullet lines.
pub fn parse_criteria_response(reply: &str) -> Vec<String> {
    if let (Some(start), Some(end)) = (reply.find('['), reply.rfind(']')) {
        if start < end {
            if let Ok(criteria) = serde_json::from_str::<Vec<String>>(&reply[start..=end]) {
                return criteria
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .take(MAX_CRITERIA)
                    .collect();
            }
        }
    }
    criteria_from_text(reply)
}

fn criteria_from_text(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| LIST_MARKER.is_match(line))
        .map(|line| {
            LIST_MARKER
                .replace(line, "")
                .trim()
                .trim_end_matches(',')
                .trim_matches('"')
                .trim()
                .to_string()
        })
        .filter(|line| line.len() > MIN_CRITERION_LEN && line.len() < MAX_BULLET_LEN)
        .take(MAX_CRITERIA)
        .collect()
}

/// Generalises employer wording and redacts personal or confidential details.
/// Criteria that end up mostly redacted, or are too short to be meaningful, are dropped.
pub fn filter_sensitive(criteria: &[String]) -> Vec<String> {
    criteria
        .iter()
        .filter(|c| c.trim().len() >= MIN_CRITERION_LEN)
        .filter_map(|criterion| {
            let mut filtered = criterion.trim().to_lowercase();
            for (specific, generic) in GENERIC_REPLACEMENTS {
                filtered = filtered.replace(specific, generic);
            }
            for pattern in SENSITIVE_PATTERNS.iter() {
                filtered = pattern.replace_all(&filtered, REDACTED).into_owned();
            }

            if filtered.matches(REDACTED).count() > MAX_REDACTIONS {
                return None;
            }
            Some(capitalize(&filtered))
        })
        .collect()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Role-specific default criteria.
pub fn fallback_criteria(job_title: &str) -> Vec<String> {
    let title = job_title.to_lowercase();
    let criteria: &[&str] = if title.contains("developer") || title.contains("engineer") {
        GENERIC_CRITERIA
    } else if title.contains("designer") {
        &[
            "Visual design quality and aesthetics",
            "User experience and interface usability",
            "Creative problem-solving approach",
            "Design consistency and attention to detail",
            "Presentation and communication of design decisions",
        ]
    } else if title.contains("data") || title.contains("analyst") {
        &[
            "Data analysis accuracy and methodology",
            "Visualization clarity and effectiveness",
            "Problem-solving approach and insights",
            "Documentation and explanation quality",
            "Technical implementation and tools usage",
        ]
    } else {
        GENERIC_CRITERIA
    };
    criteria.iter().map(|c| c.to_string()).collect()
}

const GENERIC_CRITERIA: &[&str] = &[
    "Technical implementation quality and code structure",
    "Problem-solving approach and methodology",
    "User interface design and user experience",
    "Code documentation and clarity",
    "Creative solution and innovation",
    "Overall project presentation and completeness",
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_json_array_inside_prose() {
        let reply = "Here are the criteria:\n[\"Component architecture and state management\", \"Responsive layout\"]\nGood luck!";
        assert_eq!(
            parse_criteria_response(reply),
            strings(&["Component architecture and state management", "Responsive layout"])
        );
    }

    #[test]
    fn test_parse_bullets_when_json_is_missing() {
        let reply = "1. Quality of the REST API design\n- \"Test coverage of core flows\",\n* ok\nNot a bullet line at all\n• Clarity of the README and setup steps";
        assert_eq!(
            parse_criteria_response(reply),
            strings(&[
                "Quality of the REST API design",
                "Test coverage of core flows",
                "Clarity of the README and setup steps",
            ])
        );
    }

    #[test]
    fn test_parse_caps_at_six() {
        let items: Vec<String> = (0..9).map(|i| format!("Criterion number {}", i)).collect();
        let reply = serde_json::to_string(&items).unwrap();
        assert_eq!(parse_criteria_response(&reply).len(), 6);
    }

    #[test]
    fn test_filter_redacts_and_generalises() {
        let filtered = filter_sensitive(&strings(&[
            "Follows our company style guide sent by jane.doe@acme.io",
            "Integrates with Acme Inc billing for our client",
        ]));
        assert_eq!(
            filtered,
            strings(&[
                "Follows the organization style guide sent by [REDACTED]",
                "Integrates with [REDACTED] billing for the client",
            ])
        );
    }

    #[test]
    fn test_filter_drops_short_and_mostly_redacted() {
        let filtered = filter_sensitive(&strings(&[
            "Speed",
            "Call 555-123-4567 about confidential internal tooling",
            "Clean separation of concerns",
        ]));
        assert_eq!(filtered, strings(&["Clean separation of concerns"]));
    }

    #[test]
    fn test_fallback_by_role() {
        assert_eq!(fallback_criteria("Senior Backend Engineer").len(), 6);
        assert_eq!(fallback_criteria("Product Designer")[0], "Visual design quality and aesthetics");
        assert_eq!(fallback_criteria("Data Analyst")[0], "Data analysis accuracy and methodology");
        assert_eq!(fallback_criteria("Office Manager"), fallback_criteria("Frontend Developer"));
    }

    #[tokio::test]
    async fn test_offline_processor_uses_fallback() {
        let response = CriteriaProcessor::offline()
            .generate("UX Designer", "", "Design a checkout flow")
            .await;
        assert!(response.fallback_used);
        assert_eq!(response.criteria.len(), 5);
    }

    #[tokio::test]
    async fn test_generate_filters_llm_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "[\"Use of our platform APIs\", \"Accessibility of the interface\"]"}]
            })))
            .mount(&server)
            .await;
        let llm = AnthropicClient::new(server.uri(), "key".into(), "model".into(), Duration::from_secs(5)).unwrap();

        let response = CriteriaProcessor::new(Arc::new(llm))
            .generate("Frontend Developer", "React role", "Build a todo app")
            .await;

        assert!(!response.fallback_used);
        assert_eq!(
            response.criteria,
            strings(&["Use of the platform apis", "Accessibility of the interface"])
        );
    }

    #[tokio::test]
    async fn test_generate_falls_back_on_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let llm = AnthropicClient::new(server.uri(), "bad".into(), "model".into(), Duration::from_secs(5)).unwrap();

        let response = CriteriaProcessor::new(Arc::new(llm))
            .generate("Data Scientist", "", "Analyse churn")
            .await;

        assert!(response.fallback_used);
        assert_eq!(response.criteria[0], "Data analysis accuracy and methodology");
    }
}
