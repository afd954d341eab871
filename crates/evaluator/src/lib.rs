pub mod criteria;
pub mod error;
pub mod files;
pub mod frames;
pub mod judge;
pub mod llm;
pub mod progress;
pub mod ranking;
pub mod store;
pub mod tournament;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use criteria::CriteriaProcessor;
pub use error::{EvaluatorError, Result};
pub use files::{LocalFileStore, MemoryFileStore};
pub use frames::{ExtractionConfig, FfmpegDecoder, FrameExtractor, VideoDecoder};
pub use judge::{Judge, JudgeClient, JudgeConfig, Verdict, Winner};
pub use llm::{AnthropicClient, RetryPolicy};
pub use progress::ProgressTracker;
pub use ranking::RankingAggregator;
pub use store::MemoryStore;
pub use tournament::{RunOutcome, SchedulerConfig, StartedRun, TournamentScheduler};
pub use traits::{EvaluationStore, FileStore};
