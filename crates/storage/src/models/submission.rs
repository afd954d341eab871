use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{EvaluationStatus, ExtractionStatus, ProsCons};

/// One applicant's video entry to a task, together with its latest ranking projection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Submission {
    pub submission_id: Uuid,
    pub task_id: Uuid,
    pub applicant_email: String,
    pub applicant_name: String,
    pub video_path: String,
    pub artifact_path: Option<String>,
    pub extraction_status: ExtractionStatus,
    pub extraction_error: Option<String>,
    pub evaluation_status: EvaluationStatus,
    pub rank: Option<i32>,
    pub percentile: Option<i32>,
    pub feedback: Option<String>,
    pub pros_cons: Option<ProsCons>,
    pub submitted_at: chrono::NaiveDateTime,
}

impl Submission {
    pub fn is_extracted(&self) -> bool {
        self.extraction_status == ExtractionStatus::Completed
    }
}

/// Ranking projection of a completed run onto one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RankingEntry {
    pub submission_id: Uuid,
    pub rank: i32,
    pub percentile: Option<i32>,
    pub wins: i32,
    pub losses: i32,
    pub ties: i32,
    pub feedback: String,
    pub pros_cons: ProsCons,
}
