use axum::{
    Router,
    routing::{get, post},
};

use super::handlers::{extract_frames, get_evaluation_progress, get_latest_run, start_evaluation};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/evaluate/:task_id", post(start_evaluation))
        .route("/evaluation-progress/:task_id", get(get_evaluation_progress))
        .route("/evaluations/:task_id/latest", get(get_latest_run))
        .route("/extract-frames/:task_id", post(extract_frames))
}
