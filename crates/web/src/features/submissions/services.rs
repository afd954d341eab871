use evaluator::{EvaluationStore, Result};
use storage::dto::submission::SubmissionResponse;
use uuid::Uuid;

/// List a task's submissions best rank first; unranked ones follow in submission order
pub async fn list_ranked_submissions(
    store: &dyn EvaluationStore,
    task_id: Uuid,
) -> Result<Vec<SubmissionResponse>> {
    store.get_task(task_id).await?;

    let mut submissions: Vec<SubmissionResponse> = store
        .list_submissions(task_id)
        .await?
        .into_iter()
        .map(SubmissionResponse::from)
        .collect();

    submissions.sort_by_key(|s| (s.rank.is_none(), s.rank, s.submitted_at, s.submission_id));

    Ok(submissions)
}
