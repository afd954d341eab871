use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use storage::models::{EvaluationStatus, Frame, NewComparison, ProsCons, RankingEntry, Task};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use super::pairs::all_pairs;
use crate::judge::{Evidence, Judge, JudgingContext, Verdict, Winner};
use crate::progress::ProgressTracker;
use crate::ranking::RankingAggregator;
use crate::traits::{EvaluationStore, FileStore};
use crate::{EvaluatorError, Result};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub worker_pool_size: usize,
    /// Extra attempts for a pair whose judge call failed after the client's own retries.
    pub pair_retries: u32,
    /// Above this field size a warning is logged; the run still covers every pair.
    pub max_recommended_submissions: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 4,
            pair_retries: 1,
            max_recommended_submissions: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed {
        run_id: Uuid,
        rankings: Vec<RankingEntry>,
        degraded_pairs: u32,
    },
    Failed {
        run_id: Uuid,
        reason: String,
    },
}

impl RunOutcome {
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::Completed { run_id, .. } | Self::Failed { run_id, .. } => *run_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// A run accepted by `start` and now driven in the background.
#[derive(Debug)]
pub struct StartedRun {
    pub run_id: Uuid,
    pub total_pairs: u32,
    pub handle: JoinHandle<RunOutcome>,
}

struct PreparedRun {
    task: Task,
    run_id: Uuid,
    participants: Vec<(Uuid, Vec<Frame>)>,
    pairs: Vec<(Uuid, Uuid)>,
}

struct RunState {
    run_id: Uuid,
    task_id: Uuid,
    total_pairs: u32,
    context: JudgingContext,
    evidence: HashMap<Uuid, Evidence>,
    record_lock: Mutex<()>,
    aborted: AtomicBool,
}

enum PairReport {
    Recorded { degraded: bool },
    Duplicate,
    Skipped,
    Aborted(String),
}

/// Drives the all-pairs tournament for a task and publishes the resulting ranking.
#[derive(Clone)]
pub struct TournamentScheduler {
    store: Arc<dyn EvaluationStore>,
    files: Arc<dyn FileStore>,
    judge: Arc<dyn Judge>,
    progress: ProgressTracker,
    config: SchedulerConfig,
}

impl TournamentScheduler {
    pub fn new(
        store: Arc<dyn EvaluationStore>,
        files: Arc<dyn FileStore>,
        judge: Arc<dyn Judge>,
        progress: ProgressTracker,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            files,
            judge,
            progress,
            config,
        }
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Validates and opens a run, then drives it on a background task.
    pub async fn start(&self, task_id: Uuid) -> Result<StartedRun> {
        let prepared = self.prepare(task_id).await?;
        let run_id = prepared.run_id;
        let total_pairs = prepared.pairs.len() as u32;

        let scheduler = self.clone();
        let handle = tokio::spawn(async move { scheduler.drive(prepared).await });

        Ok(StartedRun {
            run_id,
            total_pairs,
            handle,
        })
    }

    /// Validates, opens and drives a run to its end.
    pub async fn run(&self, task_id: Uuid) -> Result<RunOutcome> {
        let prepared = self.prepare(task_id).await?;
        Ok(self.drive(prepared).await)
    }

    async fn prepare(&self, task_id: Uuid) -> Result<PreparedRun> {
        let task = self.store.get_task(task_id).await?;

        let mut participants = Vec::new();
        for submission in self.store.list_submissions(task_id).await? {
            if !submission.is_extracted() {
                continue;
            }
            let frames = self.store.list_frames(submission.submission_id).await?;
            if frames.is_empty() {
                continue;
            }
            participants.push((submission.submission_id, frames));
        }

        if participants.len() < 2 {
            return Err(EvaluatorError::InsufficientSubmissions {
                task_id,
                eligible: participants.len(),
            });
        }
        if participants.len() > self.config.max_recommended_submissions {
            tracing::warn!(
                "Task {} has {} eligible submissions (recommended maximum {}); all {} pairs will be judged",
                task_id,
                participants.len(),
                self.config.max_recommended_submissions,
                super::pairs::pair_count(participants.len())
            );
        }

        let ids: Vec<Uuid> = participants.iter().map(|(id, _)| *id).collect();
        let pairs = all_pairs(&ids);
        let total_pairs = pairs.len() as u32;
        let message = format!(
            "Starting evaluation of {} submissions ({} comparisons)",
            ids.len(),
            total_pairs
        );

        if !self.progress.try_begin(task_id, total_pairs, &message) {
            return Err(EvaluatorError::EvaluationAlreadyInProgress(task_id));
        }
        let run = match self.store.create_run(task_id, total_pairs as i32, &message).await {
            Ok(run) => run,
            Err(e) => {
                self.progress.release(task_id);
                return Err(e);
            }
        };
        self.progress.attach_run(task_id, run.run_id);

        if let Err(e) = self
            .store
            .set_evaluation_status(task_id, &ids, EvaluationStatus::Evaluating)
            .await
        {
            self.abort_run(task_id, run.run_id, &e.to_string()).await;
            return Err(e);
        }

        tracing::info!(
            "Started evaluation run {} for task {}: {} submissions, {} pairs",
            run.run_id,
            task_id,
            ids.len(),
            total_pairs
        );

        Ok(PreparedRun {
            task,
            run_id: run.run_id,
            participants,
            pairs,
        })
    }

    async fn drive(&self, prepared: PreparedRun) -> RunOutcome {
        let task_id = prepared.task.task_id;
        let run_id = prepared.run_id;

        match self.execute(prepared).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let reason = e.to_string();
                tracing::error!("Evaluation run {} failed: {}", run_id, reason);
                self.abort_run(task_id, run_id, &reason).await;
                RunOutcome::Failed { run_id, reason }
            }
        }
    }

    async fn execute(&self, prepared: PreparedRun) -> Result<RunOutcome> {
        let PreparedRun {
            task,
            run_id,
            participants,
            pairs,
        } = prepared;
        let task_id = task.task_id;
        let total_pairs = pairs.len() as u32;

        self.progress.set_message(task_id, "Loading evidence");
        let mut evidence = HashMap::with_capacity(participants.len());
        for (submission_id, frames) in &participants {
            let loaded = Evidence::load(self.files.as_ref(), *submission_id, frames).await?;
            evidence.insert(*submission_id, loaded);
        }

        let state = Arc::new(RunState {
            run_id,
            task_id,
            total_pairs,
            context: JudgingContext {
                task_description: task.description,
                criteria: task.criteria,
            },
            evidence,
            record_lock: Mutex::new(()),
            aborted: AtomicBool::new(false),
        });

        let semaphore = Arc::new(Semaphore::new(self.config.worker_pool_size.max(1)));
        let mut join_set = JoinSet::new();
        for (index, pair) in pairs.into_iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| EvaluatorError::TaskError(e.to_string()))?;
            if state.aborted.load(Ordering::SeqCst) {
                break;
            }

            let scheduler = self.clone();
            let state = state.clone();
            join_set.spawn(async move {
                let _permit = permit;
                scheduler.judge_pair(&state, index, pair).await
            });
        }

        let mut degraded = 0u32;
        let mut fatal: Option<String> = None;
        let mut task_failure: Option<String> = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(PairReport::Recorded { degraded: true })) => degraded += 1,
                Ok(Ok(PairReport::Recorded { .. } | PairReport::Duplicate | PairReport::Skipped)) => {}
                Ok(Ok(PairReport::Aborted(reason))) => {
                    fatal.get_or_insert(reason);
                }
                Ok(Err(e)) => {
                    task_failure.get_or_insert(e.to_string());
                }
                Err(e) => {
                    task_failure.get_or_insert(format!("comparison task panicked: {}", e));
                }
            }
        }

        if let Some(reason) = fatal {
            tracing::error!("Evaluation run {} aborted: {}", run_id, reason);
            self.abort_run(task_id, run_id, &reason).await;
            return Ok(RunOutcome::Failed { run_id, reason });
        }
        if let Some(reason) = task_failure {
            return Err(EvaluatorError::TaskError(reason));
        }
        if degraded == total_pairs {
            let reason = format!("All {} comparisons failed", total_pairs);
            tracing::error!("Evaluation run {} failed: {}", run_id, reason);
            self.abort_run(task_id, run_id, &reason).await;
            return Ok(RunOutcome::Failed { run_id, reason });
        }

        let ids: Vec<Uuid> = participants.iter().map(|(id, _)| *id).collect();
        let comparisons = self.store.list_comparisons(run_id).await?;
        let rankings = RankingAggregator::rank(&ids, &comparisons);

        let message = format!(
            "Evaluation complete: {} submissions ranked, {} of {} comparisons degraded",
            ids.len(),
            degraded,
            total_pairs
        );
        self.store.complete_run(run_id, &rankings, &message).await?;
        self.progress.complete(task_id, &message);
        tracing::info!("Evaluation run {} completed: {}", run_id, message);

        Ok(RunOutcome::Completed {
            run_id,
            rankings,
            degraded_pairs: degraded,
        })
    }

    async fn judge_pair(&self, state: &RunState, index: usize, (low, high): (Uuid, Uuid)) -> Result<PairReport> {
        if state.aborted.load(Ordering::SeqCst) {
            return Ok(PairReport::Skipped);
        }

        // odd pairs are shown high-first
        let flipped = index % 2 == 1;
        let (first, second) = if flipped { (high, low) } else { (low, high) };
        let a = self.evidence_for(state, first)?;
        let b = self.evidence_for(state, second)?;

        let mut attempts = 0u32;
        let verdict = loop {
            attempts += 1;
            match self.judge.compare(&state.context, a, b).await {
                Ok(verdict) => break Ok(verdict),
                Err(e) if e.is_fatal_for_run() => {
                    state.aborted.store(true, Ordering::SeqCst);
                    return Ok(PairReport::Aborted(e.to_string()));
                }
                Err(e) if e.is_retryable() && attempts <= self.config.pair_retries => {
                    tracing::warn!(
                        "Comparison {} vs {} failed (attempt {}), retrying: {}",
                        low,
                        high,
                        attempts,
                        e
                    );
                }
                Err(e) => break Err(e),
            }
        };

        let comparison = match verdict {
            Ok(verdict) => {
                let verdict = if flipped { verdict.swapped() } else { verdict };
                decided_comparison(low, high, verdict, attempts)
            }
            Err(e) => {
                tracing::warn!(
                    "Comparison {} vs {} recorded as a degraded tie after {} attempts: {}",
                    low,
                    high,
                    attempts,
                    e
                );
                degraded_comparison(low, high, &e, attempts)
            }
        };

        let _guard = state.record_lock.lock().await;
        let recorded = self.store.record_comparison(state.run_id, &comparison).await?;
        if !recorded.inserted {
            tracing::debug!("Comparison {} vs {} already recorded", low, high);
            return Ok(PairReport::Duplicate);
        }

        let message = format!(
            "Compared {} of {} pairs",
            recorded.completed_pairs, state.total_pairs
        );
        self.progress.record_pair(
            state.task_id,
            recorded.completed_pairs as u32,
            recorded.degraded_pairs as u32,
            &message,
        );
        if let Err(e) = self.store.update_run_message(state.run_id, &message).await {
            tracing::warn!("Failed to persist progress for run {}: {}", state.run_id, e);
        }

        Ok(PairReport::Recorded {
            degraded: comparison.degraded,
        })
    }

    fn evidence_for<'a>(&self, state: &'a RunState, submission_id: Uuid) -> Result<&'a Evidence> {
        state.evidence.get(&submission_id).ok_or_else(|| {
            EvaluatorError::TaskError(format!("no evidence loaded for submission {}", submission_id))
        })
    }

    async fn abort_run(&self, task_id: Uuid, run_id: Uuid, reason: &str) {
        if let Err(e) = self.store.fail_run(run_id, reason).await {
            tracing::error!("Failed to mark run {} as failed: {}", run_id, e);
        }
        self.progress.fail(task_id, reason);
    }
}

/// `verdict` must already be in canonical order, with `A` as the low side.
fn decided_comparison(low: Uuid, high: Uuid, verdict: Verdict, attempts: u32) -> NewComparison {
    NewComparison {
        submission_low: low,
        submission_high: high,
        winner_id: match verdict.winner {
            Winner::A => Some(low),
            Winner::B => Some(high),
            Winner::Tie => None,
        },
        rationale: verdict.rationale,
        feedback_low: verdict.feedback_a,
        feedback_high: verdict.feedback_b,
        pros_cons_low: verdict.pros_cons_a,
        pros_cons_high: verdict.pros_cons_b,
        degraded: false,
        attempts: attempts as i32,
    }
}

fn degraded_comparison(low: Uuid, high: Uuid, error: &EvaluatorError, attempts: u32) -> NewComparison {
    NewComparison {
        submission_low: low,
        submission_high: high,
        winner_id: None,
        rationale: format!("Comparison could not be judged: {}", error),
        feedback_low: String::new(),
        feedback_high: String::new(),
        pros_cons_low: ProsCons::default(),
        pros_cons_high: ProsCons::default(),
        degraded: true,
        attempts: attempts as i32,
    }
}
