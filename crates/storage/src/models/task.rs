use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A technical task applicants submit videos against. Read-only for the evaluation core.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub task_id: Uuid,
    pub title: String,
    pub description: String,
    /// Ordered evaluation criteria handed to the judge.
    pub criteria: Vec<String>,
    pub created_at: chrono::NaiveDateTime,
}
