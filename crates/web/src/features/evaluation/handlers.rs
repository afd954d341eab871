use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::dto::evaluation::{
    BatchExtractionSummary, EvaluationProgress, RunSummaryResponse, StartEvaluationResponse,
};
use uuid::Uuid;

use crate::{error::WebError, state::AppState};

use super::services;

#[utoipa::path(
    post,
    path = "/api/evaluate/{task_id}",
    params(
        ("task_id" = Uuid, Path, description = "Task identifier")
    ),
    responses(
        (status = 202, description = "Evaluation run accepted", body = StartEvaluationResponse),
        (status = 400, description = "Fewer than two extracted submissions"),
        (status = 404, description = "Task not found"),
        (status = 409, description = "An evaluation is already running for this task")
    ),
    tag = "evaluation"
)]
pub async fn start_evaluation(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let response = services::start_evaluation(&state.scheduler, task_id).await?;

    Ok((StatusCode::ACCEPTED, Json(response)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/evaluation-progress/{task_id}",
    params(
        ("task_id" = Uuid, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "Current progress snapshot", body = EvaluationProgress)
    ),
    tag = "evaluation"
)]
pub async fn get_evaluation_progress(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, WebError> {
    Ok(Json(state.progress.get_progress(task_id)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/evaluations/{task_id}/latest",
    params(
        ("task_id" = Uuid, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "Latest evaluation run", body = RunSummaryResponse),
        (status = 404, description = "Task not found or never evaluated")
    ),
    tag = "evaluation"
)]
pub async fn get_latest_run(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let run = services::get_latest_run(state.store.as_ref(), task_id)
        .await?
        .ok_or(WebError::NotFound)?;

    Ok(Json(RunSummaryResponse::from(run)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/extract-frames/{task_id}",
    params(
        ("task_id" = Uuid, Path, description = "Task identifier")
    ),
    responses(
        (status = 200, description = "Extraction finished for every submission", body = BatchExtractionSummary),
        (status = 404, description = "Task not found")
    ),
    tag = "evaluation"
)]
pub async fn extract_frames(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, WebError> {
    let summary = services::extract_frames(&state.extractor, task_id).await?;

    Ok(Json(summary).into_response())
}
