use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One extracted still image belonging to exactly one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Frame {
    pub frame_id: Uuid,
    pub submission_id: Uuid,
    pub position: i32,
    pub path: String,
    pub timestamp_ms: i64,
    pub created_at: chrono::NaiveDateTime,
}

/// A frame that has been written to disk but not yet swapped into the evidence set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFrame {
    pub position: i32,
    pub path: String,
    pub timestamp_ms: i64,
}
