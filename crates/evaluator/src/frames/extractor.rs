use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storage::dto::evaluation::{BatchExtractionSummary, ExtractionFailure};
use storage::models::{ExtractionStatus, Frame, NewFrame, Submission};
use uuid::Uuid;

use super::decoder::VideoDecoder;
use super::fingerprint::{Fingerprint, dedup_consecutive};
use super::sampling::{sample_timestamps, select_evenly};
use crate::traits::{EvaluationStore, FileStore};
use crate::{EvaluatorError, Result};

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub sample_interval: Duration,
    pub edge_trim: Duration,
    /// Maximum Hamming distance at which two consecutive samples count as the same scene.
    pub dedup_threshold: u32,
    pub max_frames: usize,
    pub frames_root: PathBuf,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(1_500),
            edge_trim: Duration::from_millis(300),
            dedup_threshold: 5,
            max_frames: 8,
            frames_root: PathBuf::from("./frames"),
        }
    }
}

/// Turns a submission's video into a small ordered evidence set of still images.
pub struct FrameExtractor {
    store: Arc<dyn EvaluationStore>,
    files: Arc<dyn FileStore>,
    decoder: Arc<dyn VideoDecoder>,
    config: ExtractionConfig,
}

impl FrameExtractor {
    pub fn new(
        store: Arc<dyn EvaluationStore>,
        files: Arc<dyn FileStore>,
        decoder: Arc<dyn VideoDecoder>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            store,
            files,
            decoder,
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Capture instants for a video: cadence sampling, scene dedup, then the frame cap.
    pub async fn plan(&self, video: &Path) -> Result<Vec<Duration>> {
        let probe = self.decoder.probe(video).await?;
        let candidates = if probe.duration.is_zero() {
            vec![Duration::ZERO]
        } else {
            sample_timestamps(probe.duration, self.config.sample_interval, self.config.edge_trim)
        };

        let mut sampled = Vec::with_capacity(candidates.len());
        let mut fingerprints = Vec::with_capacity(candidates.len());
        for at in candidates {
            let fingerprint = match self.decoder.thumbnail(video, at).await {
                Ok(pixels) => Fingerprint::from_gray(&pixels),
                Err(e) => Err(e),
            };
            match fingerprint {
                Ok(fingerprint) => {
                    sampled.push(at);
                    fingerprints.push(fingerprint);
                }
                Err(e) => {
                    tracing::debug!("Skipping sample at {:?} in {}: {}", at, video.display(), e);
                }
            }
        }

        if sampled.is_empty() {
            return Err(EvaluatorError::UnreadableVideo {
                path: video.to_path_buf(),
                reason: "no decodable frame".to_string(),
            });
        }

        let distinct: Vec<Duration> = dedup_consecutive(&fingerprints, self.config.dedup_threshold)
            .into_iter()
            .map(|index| sampled[index])
            .collect();

        Ok(select_evenly(&distinct, self.config.max_frames))
    }

    /// Extracts one submission and records the outcome on its extraction status.
    ///
    /// The previous evidence set stays in place until the new one is fully written.
    pub async fn extract_submission(&self, submission_id: Uuid) -> Result<Vec<Frame>> {
        let submission = self.store.get_submission(submission_id).await?;

        match self.capture(&submission).await {
            Ok(frames) => {
                self.store
                    .set_extraction_status(submission_id, ExtractionStatus::Completed, None)
                    .await?;
                tracing::info!(
                    "Extracted {} frames for submission {}",
                    frames.len(),
                    submission_id
                );
                Ok(frames)
            }
            Err(e) => {
                tracing::warn!("Frame extraction failed for submission {}: {}", submission_id, e);
                self.store
                    .set_extraction_status(
                        submission_id,
                        ExtractionStatus::Failed,
                        Some(&e.to_string()),
                    )
                    .await?;
                Err(e)
            }
        }
    }

    /// Extracts every submission of a task. A failing submission never aborts its siblings.
    pub async fn extract_task(&self, task_id: Uuid) -> Result<BatchExtractionSummary> {
        self.store.get_task(task_id).await?;
        let submissions = self.store.list_submissions(task_id).await?;

        let mut summary = BatchExtractionSummary {
            task_id,
            ..Default::default()
        };

        for submission in submissions {
            summary.processed += 1;
            match self.extract_submission(submission.submission_id).await {
                Ok(_) => summary.succeeded += 1,
                Err(e) => {
                    summary.failed += 1;
                    summary.failures.push(ExtractionFailure {
                        submission_id: submission.submission_id,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Batch extraction for task {}: {} processed, {} succeeded, {} failed",
            task_id,
            summary.processed,
            summary.succeeded,
            summary.failed
        );
        Ok(summary)
    }

    async fn capture(&self, submission: &Submission) -> Result<Vec<Frame>> {
        let video = PathBuf::from(&submission.video_path);
        if !self.files.exists(&video).await? {
            return Err(EvaluatorError::UnreadableVideo {
                path: video,
                reason: "file not found".to_string(),
            });
        }

        let timestamps = self.plan(&video).await?;

        let generation = Uuid::new_v4().simple().to_string();
        let directory = self
            .config
            .frames_root
            .join(submission.submission_id.to_string())
            .join(generation);

        let mut written = Vec::with_capacity(timestamps.len());
        for (position, at) in timestamps.iter().enumerate() {
            let path = directory.join(format!("frame_{:04}.jpg", position));
            let stored = match self.decoder.capture_jpeg(&video, *at).await {
                Ok(jpeg) => self.files.write(&path, &jpeg).await,
                Err(e) => Err(e),
            };
            if let Err(e) = stored {
                self.discard(&written).await;
                return Err(e);
            }
            written.push(NewFrame {
                position: position as i32,
                path: path.to_string_lossy().into_owned(),
                timestamp_ms: at.as_millis() as i64,
            });
        }

        let replaced = match self
            .store
            .replace_frames(submission.submission_id, &written)
            .await
        {
            Ok(replaced) => replaced,
            Err(e) => {
                self.discard(&written).await;
                return Err(e);
            }
        };

        let submission_root = self
            .config
            .frames_root
            .join(submission.submission_id.to_string());
        let mut stale_dirs: Vec<PathBuf> = Vec::new();
        for frame in replaced {
            let path = Path::new(&frame.path);
            if let Err(e) = self.files.delete(path).await {
                tracing::warn!("Failed to delete superseded frame {}: {}", frame.path, e);
            }
            if let Some(parent) = path.parent()
                && parent != directory.as_path()
                && parent.starts_with(&submission_root)
                && !stale_dirs.iter().any(|dir| dir.as_path() == parent)
            {
                stale_dirs.push(parent.to_path_buf());
            }
        }
        for dir in stale_dirs {
            if let Err(e) = self.files.delete_dir(&dir).await {
                tracing::warn!("Failed to remove frame directory {}: {}", dir.display(), e);
            }
        }

        self.store.list_frames(submission.submission_id).await
    }

    async fn discard(&self, frames: &[NewFrame]) {
        for frame in frames {
            if let Err(e) = self.files.delete(Path::new(&frame.path)).await {
                tracing::warn!("Failed to clean up frame {}: {}", frame.path, e);
            }
        }
    }
}
