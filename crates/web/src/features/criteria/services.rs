use evaluator::CriteriaProcessor;
use storage::dto::criteria::{GenerateCriteriaRequest, GeneratedCriteriaResponse};

/// Derive criteria from a job posting; never fails, falling back to role defaults
pub async fn generate_criteria(
    processor: &CriteriaProcessor,
    request: &GenerateCriteriaRequest,
) -> GeneratedCriteriaResponse {
    processor
        .generate(
            &request.job_title,
            &request.job_description,
            &request.example_task,
        )
        .await
}
