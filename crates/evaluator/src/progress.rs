use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use storage::dto::evaluation::{EvaluationProgress, RunPhase};
use uuid::Uuid;

/// Process-wide view of evaluation runs, keyed by task.
///
/// Cloning shares the same map. Entries outlive their run so clients can read the final
/// status; nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    runs: Arc<DashMap<Uuid, EvaluationProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the task for a new run. Returns false if a run is already in flight.
    pub fn try_begin(&self, task_id: Uuid, total_pairs: u32, message: &str) -> bool {
        let progress = EvaluationProgress {
            message: message.to_string(),
            completed: false,
            phase: RunPhase::Running,
            run_id: None,
            total_pairs,
            completed_pairs: 0,
            degraded_pairs: 0,
        };

        match self.runs.entry(task_id) {
            Entry::Occupied(entry) if entry.get().phase == RunPhase::Running => false,
            Entry::Occupied(mut entry) => {
                entry.insert(progress);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(progress);
                true
            }
        }
    }

    pub fn attach_run(&self, task_id: Uuid, run_id: Uuid) {
        if let Some(mut progress) = self.runs.get_mut(&task_id) {
            progress.run_id = Some(run_id);
        }
    }

    pub fn record_pair(&self, task_id: Uuid, completed_pairs: u32, degraded_pairs: u32, message: &str) {
        if let Some(mut progress) = self.runs.get_mut(&task_id) {
            progress.completed_pairs = completed_pairs;
            progress.degraded_pairs = degraded_pairs;
            progress.message = message.to_string();
        }
    }

    pub fn set_message(&self, task_id: Uuid, message: &str) {
        if let Some(mut progress) = self.runs.get_mut(&task_id) {
            progress.message = message.to_string();
        }
    }

    pub fn complete(&self, task_id: Uuid, message: &str) {
        self.finish(task_id, RunPhase::Completed, message.to_string());
    }

    pub fn fail(&self, task_id: Uuid, reason: &str) {
        self.finish(task_id, RunPhase::Failed, format!("Evaluation failed: {}", reason));
    }

    /// Drops the claim taken by `try_begin` when the run never started.
    pub fn release(&self, task_id: Uuid) {
        self.runs
            .remove_if(&task_id, |_, progress| progress.run_id.is_none());
    }

    pub fn get_progress(&self, task_id: Uuid) -> EvaluationProgress {
        self.runs
            .get(&task_id)
            .map(|progress| progress.clone())
            .unwrap_or_else(EvaluationProgress::idle)
    }

    pub fn is_running(&self, task_id: Uuid) -> bool {
        self.runs
            .get(&task_id)
            .is_some_and(|progress| progress.phase == RunPhase::Running)
    }

    fn finish(&self, task_id: Uuid, phase: RunPhase, message: String) {
        if let Some(mut progress) = self.runs.get_mut(&task_id) {
            progress.phase = phase;
            progress.completed = true;
            progress.message = message;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_task_is_idle() {
        let tracker = ProgressTracker::new();
        let progress = tracker.get_progress(Uuid::new_v4());

        assert_eq!(progress, EvaluationProgress::idle());
        assert!(progress.completed);
        assert_eq!(progress.message, "No evaluation in progress");
    }

    #[test]
    fn test_second_begin_is_rejected_while_running() {
        let tracker = ProgressTracker::new();
        let task_id = Uuid::new_v4();

        assert!(tracker.try_begin(task_id, 6, "Starting"));
        assert!(!tracker.try_begin(task_id, 6, "Starting"));

        tracker.complete(task_id, "Done");
        assert!(tracker.try_begin(task_id, 3, "Starting again"));
        assert_eq!(tracker.get_progress(task_id).total_pairs, 3);
    }

    #[test]
    fn test_lifecycle_snapshots() {
        let tracker = ProgressTracker::new();
        let task_id = Uuid::new_v4();
        let run_id = Uuid::new_v4();

        tracker.try_begin(task_id, 6, "Starting");
        tracker.attach_run(task_id, run_id);
        tracker.record_pair(task_id, 2, 1, "Compared 2 of 6 pairs");

        let running = tracker.get_progress(task_id);
        assert_eq!(running.phase, RunPhase::Running);
        assert!(!running.completed);
        assert_eq!(running.run_id, Some(run_id));
        assert_eq!((running.completed_pairs, running.degraded_pairs), (2, 1));

        tracker.fail(task_id, "judge rejected credentials");
        let failed = tracker.get_progress(task_id);
        assert_eq!(failed.phase, RunPhase::Failed);
        assert!(failed.completed);
        assert!(failed.message.starts_with("Evaluation failed"));
        assert!(!tracker.is_running(task_id));
    }

    #[test]
    fn test_release_only_drops_unstarted_claims() {
        let tracker = ProgressTracker::new();
        let claimed = Uuid::new_v4();
        let started = Uuid::new_v4();

        tracker.try_begin(claimed, 1, "Starting");
        tracker.try_begin(started, 1, "Starting");
        tracker.attach_run(started, Uuid::new_v4());

        tracker.release(claimed);
        tracker.release(started);

        assert_eq!(tracker.get_progress(claimed).phase, RunPhase::Idle);
        assert!(tracker.is_running(started));
    }
}
