use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, EvaluatorError>;

#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("Video '{path}' could not be opened: {reason}")]
    UnreadableVideo { path: PathBuf, reason: String },

    #[error("Frame decoding failed: {0}")]
    Decoder(String),

    #[error("Judge returned an unusable verdict: {0}")]
    JudgeFormat(String),

    #[error("Judge unavailable: {0}")]
    JudgeUnavailable(String),

    #[error("Judge rejected credentials: {0}")]
    JudgeAuth(String),

    #[error("Evaluation already in progress for task {0}")]
    EvaluationAlreadyInProgress(Uuid),

    #[error("Need at least 2 eligible submissions to evaluate task {task_id}, found {eligible}")]
    InsufficientSubmissions { task_id: Uuid, eligible: usize },

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::error::StorageError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Background task failed: {0}")]
    TaskError(String),
}

impl EvaluatorError {
    /// Per-pair judge failures the scheduler may retry before degrading the pair to a tie.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::JudgeFormat(_) | Self::JudgeUnavailable(_))
    }

    /// Failures that abort the whole evaluation run.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, Self::JudgeAuth(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::StorageError(storage::error::StorageError::NotFound)
        )
    }
}
