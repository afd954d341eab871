use async_trait::async_trait;
use storage::Database;
use storage::models::{
    ComparisonResult, EvaluationRun, EvaluationStatus, ExtractionStatus, Frame, NewComparison,
    NewFrame, RankingEntry, RecordedComparison, Submission, Task,
};
use storage::repository::{
    comparison::ComparisonRepository, evaluation_run::EvaluationRunRepository,
    frame::FrameRepository, submission::SubmissionRepository, task::TaskRepository,
};
use uuid::Uuid;

use crate::traits::EvaluationStore;
use crate::{EvaluatorError, Result};

#[async_trait]
impl EvaluationStore for Database {
    async fn get_task(&self, task_id: Uuid) -> Result<Task> {
        Ok(TaskRepository::new(self.pool()).find_by_id(task_id).await?)
    }

    async fn list_submissions(&self, task_id: Uuid) -> Result<Vec<Submission>> {
        Ok(SubmissionRepository::new(self.pool())
            .list_by_task(task_id)
            .await?)
    }

    async fn get_submission(&self, submission_id: Uuid) -> Result<Submission> {
        Ok(SubmissionRepository::new(self.pool())
            .find_by_id(submission_id)
            .await?)
    }

    async fn set_extraction_status(
        &self,
        submission_id: Uuid,
        status: ExtractionStatus,
        error: Option<&str>,
    ) -> Result<()> {
        Ok(SubmissionRepository::new(self.pool())
            .set_extraction_status(submission_id, status, error)
            .await?)
    }

    async fn set_evaluation_status(
        &self,
        task_id: Uuid,
        submission_ids: &[Uuid],
        status: EvaluationStatus,
    ) -> Result<()> {
        Ok(SubmissionRepository::new(self.pool())
            .set_evaluation_status(task_id, submission_ids, status)
            .await?)
    }

    async fn list_frames(&self, submission_id: Uuid) -> Result<Vec<Frame>> {
        Ok(FrameRepository::new(self.pool())
            .list_for_submission(submission_id)
            .await?)
    }

    async fn replace_frames(&self, submission_id: Uuid, frames: &[NewFrame]) -> Result<Vec<Frame>> {
        Ok(FrameRepository::new(self.pool())
            .replace(submission_id, frames)
            .await?)
    }

    async fn create_run(&self, task_id: Uuid, total_pairs: i32, message: &str) -> Result<EvaluationRun> {
        EvaluationRunRepository::new(self.pool())
            .create(task_id, total_pairs, message)
            .await
            .map_err(|e| match e {
                storage::error::StorageError::ConstraintViolation(_) => {
                    EvaluatorError::EvaluationAlreadyInProgress(task_id)
                }
                other => other.into(),
            })
    }

    async fn latest_run(&self, task_id: Uuid) -> Result<Option<EvaluationRun>> {
        Ok(EvaluationRunRepository::new(self.pool())
            .latest_for_task(task_id)
            .await?)
    }

    async fn update_run_message(&self, run_id: Uuid, message: &str) -> Result<()> {
        Ok(EvaluationRunRepository::new(self.pool())
            .update_message(run_id, message)
            .await?)
    }

    async fn record_comparison(
        &self,
        run_id: Uuid,
        comparison: &NewComparison,
    ) -> Result<RecordedComparison> {
        Ok(ComparisonRepository::new(self.pool())
            .record(run_id, comparison)
            .await?)
    }

    async fn list_comparisons(&self, run_id: Uuid) -> Result<Vec<ComparisonResult>> {
        Ok(ComparisonRepository::new(self.pool())
            .list_for_run(run_id)
            .await?)
    }

    async fn complete_run(&self, run_id: Uuid, rankings: &[RankingEntry], message: &str) -> Result<()> {
        Ok(EvaluationRunRepository::new(self.pool())
            .complete(run_id, rankings, message)
            .await?)
    }

    async fn fail_run(&self, run_id: Uuid, reason: &str) -> Result<()> {
        Ok(EvaluationRunRepository::new(self.pool())
            .fail(run_id, reason)
            .await?)
    }

    async fn fail_interrupted_runs(&self, reason: &str) -> Result<u64> {
        Ok(EvaluationRunRepository::new(self.pool())
            .fail_running_runs(reason)
            .await?)
    }
}
