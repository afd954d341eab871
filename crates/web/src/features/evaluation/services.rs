use evaluator::{
    EvaluationStore, FrameExtractor, Result, RunOutcome, StartedRun, TournamentScheduler,
};
use storage::{
    dto::evaluation::{BatchExtractionSummary, StartEvaluationResponse},
    models::EvaluationRun,
};
use uuid::Uuid;

/// Open a run for the task and leave it running in the background
pub async fn start_evaluation(
    scheduler: &TournamentScheduler,
    task_id: Uuid,
) -> Result<StartEvaluationResponse> {
    let StartedRun {
        run_id,
        total_pairs,
        handle,
    } = scheduler.start(task_id).await?;

    tokio::spawn(async move {
        match handle.await {
            Ok(RunOutcome::Completed { degraded_pairs, .. }) => {
                tracing::info!(
                    "Run {} for task {} completed ({} degraded)",
                    run_id,
                    task_id,
                    degraded_pairs
                );
            }
            Ok(RunOutcome::Failed { reason, .. }) => {
                tracing::warn!("Run {} for task {} failed: {}", run_id, task_id, reason);
            }
            Err(e) => {
                tracing::error!("Run {} for task {} panicked: {}", run_id, task_id, e);
            }
        }
    });

    Ok(StartEvaluationResponse {
        run_id,
        task_id,
        total_pairs,
        message: format!("Evaluation started: {} comparisons queued", total_pairs),
    })
}

/// Most recent run for the task, after checking the task exists
pub async fn get_latest_run(
    store: &dyn EvaluationStore,
    task_id: Uuid,
) -> Result<Option<EvaluationRun>> {
    store.get_task(task_id).await?;
    store.latest_run(task_id).await
}

/// Extract frames for every submission of the task
pub async fn extract_frames(
    extractor: &FrameExtractor,
    task_id: Uuid,
) -> Result<BatchExtractionSummary> {
    extractor.extract_task(task_id).await
}
