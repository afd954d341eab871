use axum::{Router, routing::get};

use super::handlers::list_submissions;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:task_id", get(list_submissions))
}
