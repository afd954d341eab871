use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use storage::dto::submission::SubmissionResponse;
use uuid::Uuid;

use crate::{error::WebError, state::AppState};

use super::services;

#[utoipa::path(
    get,
    path = "/api/submissions/{task_id}",
    params(
        ("task_id" = Uuid, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "Submissions sorted by rank, unranked last", body = Vec<SubmissionResponse>),
        (status = 404, description = "Task not found")
    ),
    tag = "submissions"
)]
pub async fn list_submissions(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let submissions = services::list_ranked_submissions(state.store.as_ref(), task_id).await?;

    Ok(Json(submissions).into_response())
}
