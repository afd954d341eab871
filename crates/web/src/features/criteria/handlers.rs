use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use storage::dto::criteria::{GenerateCriteriaRequest, GeneratedCriteriaResponse};
use validator::Validate;

use crate::{error::WebError, state::AppState};

use super::services;

#[utoipa::path(
    post,
    path = "/api/criteria/generate",
    request_body = GenerateCriteriaRequest,
    responses(
        (status = 200, description = "Criteria generated", body = GeneratedCriteriaResponse),
        (status = 400, description = "Invalid input")
    ),
    tag = "criteria"
)]
pub async fn generate_criteria(
    State(state): State<AppState>,
    Json(req): Json<GenerateCriteriaRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let response = services::generate_criteria(&state.criteria, &req).await;

    Ok(Json(response).into_response())
}
