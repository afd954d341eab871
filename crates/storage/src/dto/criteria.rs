use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request payload for deriving evaluation criteria from a job posting
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct GenerateCriteriaRequest {
    #[validate(length(
        min = 1,
        max = 255,
        message = "Job title must be between 1 and 255 characters"
    ))]
    pub job_title: String,

    #[validate(length(max = 10000))]
    #[serde(default)]
    pub job_description: String,

    #[validate(length(
        min = 1,
        max = 20000,
        message = "Example task must be between 1 and 20000 characters"
    ))]
    pub example_task: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GeneratedCriteriaResponse {
    pub criteria: Vec<String>,
    /// True when the provider was unavailable and role-based defaults were returned.
    pub fallback_used: bool,
}
