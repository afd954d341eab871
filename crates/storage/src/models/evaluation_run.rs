use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::RunStatus;

/// One execution of the all-pairs tournament for a task.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvaluationRun {
    pub run_id: Uuid,
    pub task_id: Uuid,
    pub status: RunStatus,
    pub failure_reason: Option<String>,
    pub message: String,
    pub total_pairs: i32,
    pub completed_pairs: i32,
    pub degraded_pairs: i32,
    pub started_at: chrono::NaiveDateTime,
    pub finished_at: Option<chrono::NaiveDateTime>,
}

impl EvaluationRun {
    pub fn is_active(&self) -> bool {
        self.status == RunStatus::Running
    }
}
