use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use storage::error::StorageError;
use storage::models::{
    ComparisonResult, EvaluationRun, EvaluationStatus, ExtractionStatus, Frame, NewComparison,
    NewFrame, RankingEntry, RecordedComparison, RunStatus, Submission, Task,
};
use uuid::Uuid;

use crate::traits::EvaluationStore;
use crate::{EvaluatorError, Result};

#[derive(Default)]
struct MemoryState {
    tasks: HashMap<Uuid, Task>,
    submissions: BTreeMap<Uuid, Submission>,
    frames: HashMap<Uuid, Vec<Frame>>,
    runs: Vec<EvaluationRun>,
    comparisons: HashMap<Uuid, BTreeMap<(Uuid, Uuid), ComparisonResult>>,
}

/// In-process store with the same invariants as the Postgres one.
///
/// Every operation runs under a single lock, so each call is atomic. Backs the extractor,
/// scheduler and HTTP handler tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert_task(&self, title: &str, description: &str, criteria: Vec<String>) -> Task {
        let task = Task {
            task_id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            criteria,
            created_at: chrono::Utc::now().naive_utc(),
        };
        self.state().tasks.insert(task.task_id, task.clone());
        task
    }

    pub fn insert_submission(&self, task_id: Uuid, applicant_name: &str, video_path: &str) -> Submission {
        let submission = Submission {
            submission_id: Uuid::new_v4(),
            task_id,
            applicant_email: format!("{}@example.com", applicant_name.to_lowercase()),
            applicant_name: applicant_name.to_string(),
            video_path: video_path.to_string(),
            artifact_path: None,
            extraction_status: ExtractionStatus::Pending,
            extraction_error: None,
            evaluation_status: EvaluationStatus::Pending,
            rank: None,
            percentile: None,
            feedback: None,
            pros_cons: None,
            submitted_at: chrono::Utc::now().naive_utc(),
        };
        self.state()
            .submissions
            .insert(submission.submission_id, submission.clone());
        submission
    }

    /// All runs ever opened for the task, oldest first.
    pub fn runs_for_task(&self, task_id: Uuid) -> Vec<EvaluationRun> {
        self.state()
            .runs
            .iter()
            .filter(|run| run.task_id == task_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EvaluationStore for MemoryStore {
    async fn get_task(&self, task_id: Uuid) -> Result<Task> {
        self.state()
            .tasks
            .get(&task_id)
            .cloned()
            .ok_or(StorageError::NotFound.into())
    }

    async fn list_submissions(&self, task_id: Uuid) -> Result<Vec<Submission>> {
        let state = self.state();
        let mut submissions: Vec<Submission> = state
            .submissions
            .values()
            .filter(|s| s.task_id == task_id)
            .cloned()
            .collect();
        submissions.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then(a.submission_id.cmp(&b.submission_id))
        });
        Ok(submissions)
    }

    async fn get_submission(&self, submission_id: Uuid) -> Result<Submission> {
        self.state()
            .submissions
            .get(&submission_id)
            .cloned()
            .ok_or(StorageError::NotFound.into())
    }

    async fn set_extraction_status(
        &self,
        submission_id: Uuid,
        status: ExtractionStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state();
        let submission = state
            .submissions
            .get_mut(&submission_id)
            .ok_or(StorageError::NotFound)?;
        submission.extraction_status = status;
        submission.extraction_error = error.map(String::from);
        Ok(())
    }

    async fn set_evaluation_status(
        &self,
        task_id: Uuid,
        submission_ids: &[Uuid],
        status: EvaluationStatus,
    ) -> Result<()> {
        let mut state = self.state();
        for submission in state.submissions.values_mut() {
            if submission.task_id == task_id && submission_ids.contains(&submission.submission_id) {
                submission.evaluation_status = status;
            }
        }
        Ok(())
    }

    async fn list_frames(&self, submission_id: Uuid) -> Result<Vec<Frame>> {
        Ok(self
            .state()
            .frames
            .get(&submission_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn replace_frames(&self, submission_id: Uuid, frames: &[NewFrame]) -> Result<Vec<Frame>> {
        let mut state = self.state();
        if !state.submissions.contains_key(&submission_id) {
            return Err(StorageError::NotFound.into());
        }

        let created_at = chrono::Utc::now().naive_utc();
        let replacement = frames
            .iter()
            .map(|frame| Frame {
                frame_id: Uuid::new_v4(),
                submission_id,
                position: frame.position,
                path: frame.path.clone(),
                timestamp_ms: frame.timestamp_ms,
                created_at,
            })
            .collect();

        Ok(state
            .frames
            .insert(submission_id, replacement)
            .unwrap_or_default())
    }

    async fn create_run(&self, task_id: Uuid, total_pairs: i32, message: &str) -> Result<EvaluationRun> {
        let mut state = self.state();
        if !state.tasks.contains_key(&task_id) {
            return Err(StorageError::NotFound.into());
        }
        if state
            .runs
            .iter()
            .any(|run| run.task_id == task_id && run.is_active())
        {
            return Err(EvaluatorError::EvaluationAlreadyInProgress(task_id));
        }

        let run = EvaluationRun {
            run_id: Uuid::new_v4(),
            task_id,
            status: RunStatus::Running,
            failure_reason: None,
            message: message.to_string(),
            total_pairs,
            completed_pairs: 0,
            degraded_pairs: 0,
            started_at: chrono::Utc::now().naive_utc(),
            finished_at: None,
        };
        state.runs.push(run.clone());
        Ok(run)
    }

    async fn latest_run(&self, task_id: Uuid) -> Result<Option<EvaluationRun>> {
        Ok(self
            .state()
            .runs
            .iter()
            .rev()
            .find(|run| run.task_id == task_id)
            .cloned())
    }

    async fn update_run_message(&self, run_id: Uuid, message: &str) -> Result<()> {
        let mut state = self.state();
        let run = find_run(&mut state.runs, run_id)?;
        run.message = message.to_string();
        Ok(())
    }

    async fn record_comparison(
        &self,
        run_id: Uuid,
        comparison: &NewComparison,
    ) -> Result<RecordedComparison> {
        if comparison.submission_low >= comparison.submission_high {
            return Err(StorageError::ConstraintViolation(
                "Comparison pair must be stored in canonical order".to_string(),
            )
            .into());
        }

        let mut state = self.state();
        find_run(&mut state.runs, run_id)?;

        let key = (comparison.submission_low, comparison.submission_high);
        let results = state.comparisons.entry(run_id).or_default();
        let inserted = !results.contains_key(&key);
        if inserted {
            results.insert(
                key,
                ComparisonResult {
                    comparison_id: Uuid::new_v4(),
                    run_id,
                    submission_low: comparison.submission_low,
                    submission_high: comparison.submission_high,
                    winner_id: comparison.winner_id,
                    rationale: comparison.rationale.clone(),
                    feedback_low: comparison.feedback_low.clone(),
                    feedback_high: comparison.feedback_high.clone(),
                    pros_cons_low: comparison.pros_cons_low.clone(),
                    pros_cons_high: comparison.pros_cons_high.clone(),
                    degraded: comparison.degraded,
                    attempts: comparison.attempts,
                    created_at: chrono::Utc::now().naive_utc(),
                },
            );
        }

        let run = find_run(&mut state.runs, run_id)?;
        if inserted {
            run.completed_pairs += 1;
            if comparison.degraded {
                run.degraded_pairs += 1;
            }
        }

        Ok(RecordedComparison {
            inserted,
            completed_pairs: run.completed_pairs,
            degraded_pairs: run.degraded_pairs,
        })
    }

    async fn list_comparisons(&self, run_id: Uuid) -> Result<Vec<ComparisonResult>> {
        Ok(self
            .state()
            .comparisons
            .get(&run_id)
            .map(|results| results.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn complete_run(&self, run_id: Uuid, rankings: &[RankingEntry], message: &str) -> Result<()> {
        let mut state = self.state();
        let run = find_run(&mut state.runs, run_id)?;
        run.status = RunStatus::Completed;
        run.message = message.to_string();
        run.finished_at = Some(chrono::Utc::now().naive_utc());
        let task_id = run.task_id;

        for submission in state.submissions.values_mut() {
            if submission.task_id != task_id {
                continue;
            }
            submission.rank = None;
            submission.percentile = None;
            submission.feedback = None;
            submission.pros_cons = None;

            if let Some(entry) = rankings
                .iter()
                .find(|entry| entry.submission_id == submission.submission_id)
            {
                submission.rank = Some(entry.rank);
                submission.percentile = entry.percentile;
                submission.feedback = Some(entry.feedback.clone());
                submission.pros_cons = Some(entry.pros_cons.clone());
                submission.evaluation_status = EvaluationStatus::Completed;
            }
        }
        Ok(())
    }

    async fn fail_run(&self, run_id: Uuid, reason: &str) -> Result<()> {
        let mut state = self.state();
        let run = find_run(&mut state.runs, run_id)?;
        run.status = RunStatus::Failed;
        run.failure_reason = Some(reason.to_string());
        run.message = format!("Evaluation failed: {}", reason);
        run.finished_at = Some(chrono::Utc::now().naive_utc());
        let task_id = run.task_id;

        for submission in state.submissions.values_mut() {
            if submission.task_id == task_id
                && submission.evaluation_status == EvaluationStatus::Evaluating
            {
                submission.evaluation_status = EvaluationStatus::Failed;
            }
        }
        Ok(())
    }

    async fn fail_interrupted_runs(&self, reason: &str) -> Result<u64> {
        let running: Vec<Uuid> = self
            .state()
            .runs
            .iter()
            .filter(|run| run.is_active())
            .map(|run| run.run_id)
            .collect();
        for run_id in &running {
            self.fail_run(*run_id, reason).await?;
        }
        Ok(running.len() as u64)
    }
}

fn find_run(runs: &mut [EvaluationRun], run_id: Uuid) -> Result<&mut EvaluationRun> {
    runs.iter_mut()
        .find(|run| run.run_id == run_id)
        .ok_or(StorageError::NotFound.into())
}
