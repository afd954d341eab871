use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{EvaluationStatus, ExtractionStatus, ProsCons, Submission};

/// Submission as listed for a task. Ranking fields come from the last completed run and
/// stay visible while a later run is in flight or after it fails.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponse {
    pub submission_id: Uuid,
    pub task_id: Uuid,
    pub applicant_name: String,
    pub applicant_email: String,
    pub extraction_status: ExtractionStatus,
    pub evaluation_status: EvaluationStatus,
    pub rank: Option<i32>,
    pub percentile: Option<i32>,
    pub feedback: Option<String>,
    pub pros_cons: Option<ProsCons>,
    pub submitted_at: chrono::NaiveDateTime,
}

impl From<Submission> for SubmissionResponse {
    fn from(submission: Submission) -> Self {
        // only a completed run writes the projection
        let ranked = submission.rank.is_some();

        Self {
            submission_id: submission.submission_id,
            task_id: submission.task_id,
            applicant_name: submission.applicant_name,
            applicant_email: submission.applicant_email,
            extraction_status: submission.extraction_status,
            evaluation_status: submission.evaluation_status,
            rank: submission.rank,
            percentile: submission.percentile.filter(|_| ranked),
            feedback: submission.feedback.filter(|_| ranked),
            pros_cons: submission.pros_cons.filter(|_| ranked),
            submitted_at: submission.submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn submission(status: EvaluationStatus, rank: Option<i32>) -> Submission {
        Submission {
            submission_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            applicant_email: "ada@example.com".to_string(),
            applicant_name: "Ada".to_string(),
            video_path: "/videos/ada.mp4".to_string(),
            artifact_path: None,
            extraction_status: ExtractionStatus::Completed,
            extraction_error: None,
            evaluation_status: status,
            rank,
            percentile: rank.map(|_| 100),
            feedback: rank.map(|_| "Won 2 of 2 comparisons.".to_string()),
            pros_cons: rank.map(|_| ProsCons::default()),
            submitted_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn test_previous_ranking_stays_visible_during_and_after_a_failed_rerun() {
        for status in [
            EvaluationStatus::Completed,
            EvaluationStatus::Evaluating,
            EvaluationStatus::Failed,
        ] {
            let response = SubmissionResponse::from(submission(status, Some(1)));
            assert_eq!(response.rank, Some(1), "{:?}", status);
            assert_eq!(response.percentile, Some(100));
            assert!(response.feedback.is_some());
            assert!(response.pros_cons.is_some());
        }
    }

    #[test]
    fn test_unranked_submission_exposes_no_ranking_fields() {
        let response = SubmissionResponse::from(submission(EvaluationStatus::Failed, None));
        assert!(response.rank.is_none());
        assert!(response.percentile.is_none());
        assert!(response.feedback.is_none());
        assert!(response.pros_cons.is_none());
    }
}
