use evaluator::{
    CriteriaProcessor, EvaluationStore, ExtractionConfig, FileStore, FrameExtractor, Judge,
    ProgressTracker, SchedulerConfig, TournamentScheduler, VideoDecoder,
};
use std::sync::Arc;

/// Shared services handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EvaluationStore>,
    pub scheduler: TournamentScheduler,
    pub extractor: Arc<FrameExtractor>,
    pub criteria: Arc<CriteriaProcessor>,
    pub progress: ProgressTracker,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EvaluationStore>,
        files: Arc<dyn FileStore>,
        decoder: Arc<dyn VideoDecoder>,
        judge: Arc<dyn Judge>,
        criteria: CriteriaProcessor,
        extraction: ExtractionConfig,
        scheduling: SchedulerConfig,
    ) -> Self {
        let progress = ProgressTracker::new();
        let scheduler = TournamentScheduler::new(
            store.clone(),
            files.clone(),
            judge,
            progress.clone(),
            scheduling,
        );
        let extractor = FrameExtractor::new(store.clone(), files, decoder, extraction);

        Self {
            store,
            scheduler,
            extractor: Arc::new(extractor),
            criteria: Arc::new(criteria),
            progress,
        }
    }
}
