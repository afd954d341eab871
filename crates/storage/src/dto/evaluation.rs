use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{EvaluationRun, RunStatus};

/// Phase of a task's evaluation as seen by the in-memory progress tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Live progress snapshot returned to polling clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EvaluationProgress {
    pub message: String,
    pub completed: bool,
    pub phase: RunPhase,
    pub run_id: Option<Uuid>,
    pub total_pairs: u32,
    pub completed_pairs: u32,
    pub degraded_pairs: u32,
}

impl EvaluationProgress {
    pub fn idle() -> Self {
        Self {
            message: "No evaluation in progress".to_string(),
            completed: true,
            phase: RunPhase::Idle,
            run_id: None,
            total_pairs: 0,
            completed_pairs: 0,
            degraded_pairs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StartEvaluationResponse {
    pub run_id: Uuid,
    pub task_id: Uuid,
    pub total_pairs: u32,
    pub message: String,
}

/// Company-facing summary of a run: final status plus the number of degraded pairs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RunSummaryResponse {
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

impl From<EvaluationRun> for RunSummaryResponse {
    fn from(run: EvaluationRun) -> Self {
        Self {
            run_id: run.run_id,
            task_id: run.task_id,
            status: run.status,
            failure_reason: run.failure_reason,
            message: run.message,
            total_pairs: run.total_pairs,
            completed_pairs: run.completed_pairs,
            degraded_pairs: run.degraded_pairs,
            started_at: run.started_at,
            finished_at: run.finished_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExtractionFailure {
    pub submission_id: Uuid,
    pub reason: String,
}

/// Result of a batch extraction request; individual failures never abort the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct BatchExtractionSummary {
    pub task_id: Uuid,
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub failures: Vec<ExtractionFailure>,
}
