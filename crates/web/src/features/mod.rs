use axum::Router;

use crate::state::AppState;

pub mod criteria;
pub mod evaluation;
pub mod submissions;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(evaluation::routes::routes())
        .nest("/submissions", submissions::routes::routes())
        .nest("/criteria", criteria::routes::routes())
}
