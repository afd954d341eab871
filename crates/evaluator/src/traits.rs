use async_trait::async_trait;
use std::path::Path;
use storage::models::{
    ComparisonResult, EvaluationRun, EvaluationStatus, ExtractionStatus, Frame, NewComparison,
    NewFrame, RankingEntry, RecordedComparison, Submission, Task,
};
use uuid::Uuid;

use crate::Result;

/// Row store holding tasks, submissions, frames, runs and comparison results.
///
/// Writes scoped to one task are serialised by the implementation.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn get_task(&self, task_id: Uuid) -> Result<Task>;

    async fn list_submissions(&self, task_id: Uuid) -> Result<Vec<Submission>>;

    async fn get_submission(&self, submission_id: Uuid) -> Result<Submission>;

    async fn set_extraction_status(
        &self,
        submission_id: Uuid,
        status: ExtractionStatus,
        error: Option<&str>,
    ) -> Result<()>;

    async fn set_evaluation_status(
        &self,
        task_id: Uuid,
        submission_ids: &[Uuid],
        status: EvaluationStatus,
    ) -> Result<()>;

    async fn list_frames(&self, submission_id: Uuid) -> Result<Vec<Frame>>;

    /// Atomically swap the evidence set, returning the frames that were replaced.
    async fn replace_frames(&self, submission_id: Uuid, frames: &[NewFrame]) -> Result<Vec<Frame>>;

    /// Open a running run; fails if one is already active for the task.
    async fn create_run(&self, task_id: Uuid, total_pairs: i32, message: &str) -> Result<EvaluationRun>;

    async fn latest_run(&self, task_id: Uuid) -> Result<Option<EvaluationRun>>;

    async fn update_run_message(&self, run_id: Uuid, message: &str) -> Result<()>;

    /// Idempotent per unordered pair: only the first write counts.
    async fn record_comparison(
        &self,
        run_id: Uuid,
        comparison: &NewComparison,
    ) -> Result<RecordedComparison>;

    async fn list_comparisons(&self, run_id: Uuid) -> Result<Vec<ComparisonResult>>;

    /// Mark the run completed and overwrite the task's ranking projection in one step.
    async fn complete_run(&self, run_id: Uuid, rankings: &[RankingEntry], message: &str) -> Result<()>;

    async fn fail_run(&self, run_id: Uuid, reason: &str) -> Result<()>;

    /// Fail every run left running by a previous process, returning how many there were.
    /// Call only before this process starts runs of its own.
    async fn fail_interrupted_runs(&self, reason: &str) -> Result<u64>;
}

/// Byte-level access to videos and extracted frames, addressed by path.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Deleting a missing file is not an error.
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Removes a directory together with anything still inside it. A missing directory is
    /// not an error.
    async fn delete_dir(&self, path: &Path) -> Result<()>;

    async fn exists(&self, path: &Path) -> Result<bool>;
}
