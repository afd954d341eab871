//! Scripted collaborators shared by the in-crate tests.

use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storage::models::{ExtractionStatus, NewFrame, ProsCons};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::files::MemoryFileStore;
use crate::frames::fingerprint::{THUMB_HEIGHT, THUMB_WIDTH};
use crate::frames::{VideoDecoder, VideoProbe};
use crate::judge::{Evidence, Judge, JudgingContext, Verdict, Winner};
use crate::store::MemoryStore;
use crate::traits::{EvaluationStore, FileStore};
use crate::{EvaluatorError, Result};

/// Fingerprints that are pairwise at least 32 bits apart.
const SCENE_WORDS: [u64; 8] = [
    0x0000_0000_0000_0000,
    0xFFFF_FFFF_FFFF_FFFF,
    0x0F0F_0F0F_0F0F_0F0F,
    0xF0F0_F0F0_F0F0_F0F0,
    0x3333_3333_3333_3333,
    0xCCCC_CCCC_CCCC_CCCC,
    0x5555_5555_5555_5555,
    0xAAAA_AAAA_AAAA_AAAA,
];

/// Grayscale thumbnail whose difference hash is exactly `bits`.
pub fn gray_for_bits(bits: u64) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(THUMB_WIDTH * THUMB_HEIGHT);
    for row in 0..THUMB_HEIGHT {
        let mut value: u8 = 128;
        pixels.push(value);
        for col in 0..THUMB_WIDTH - 1 {
            if bits & (1u64 << (row * (THUMB_WIDTH - 1) + col)) != 0 {
                value += 1;
            } else {
                value -= 1;
            }
            pixels.push(value);
        }
    }
    pixels
}

/// Decoder for a synthetic video whose picture changes every `scene_length`.
pub struct ScriptedDecoder {
    duration: Option<Duration>,
    scene_length: Duration,
    capture_budget: Mutex<Option<usize>>,
}

impl ScriptedDecoder {
    pub fn new(duration: Duration, scene_length: Duration) -> Self {
        Self {
            duration: Some(duration),
            scene_length,
            capture_budget: Mutex::new(None),
        }
    }

    pub fn unreadable() -> Self {
        Self {
            duration: None,
            scene_length: Duration::from_secs(1),
            capture_budget: Mutex::new(None),
        }
    }

    /// Let `count` more captures succeed, then fail every following one.
    pub fn fail_captures_after(&self, count: usize) {
        *self.capture_budget.lock().unwrap() = Some(count);
    }

    fn scene(&self, at: Duration) -> usize {
        (at.as_millis() / self.scene_length.as_millis().max(1)) as usize
    }
}

#[async_trait]
impl VideoDecoder for ScriptedDecoder {
    async fn probe(&self, path: &Path) -> Result<VideoProbe> {
        match self.duration {
            Some(duration) => Ok(VideoProbe { duration }),
            None => Err(EvaluatorError::UnreadableVideo {
                path: path.to_path_buf(),
                reason: "moov atom not found".to_string(),
            }),
        }
    }

    async fn thumbnail(&self, _path: &Path, at: Duration) -> Result<Vec<u8>> {
        Ok(gray_for_bits(SCENE_WORDS[self.scene(at) % SCENE_WORDS.len()]))
    }

    async fn capture_jpeg(&self, _path: &Path, at: Duration) -> Result<Vec<u8>> {
        let mut budget = self.capture_budget.lock().unwrap();
        match budget.as_mut() {
            Some(0) => return Err(EvaluatorError::Decoder("decoder crashed".to_string())),
            Some(remaining) => *remaining -= 1,
            None => {}
        }
        Ok(format!("jpeg@{}", at.as_millis()).into_bytes())
    }
}

/// Judge that prefers submissions earlier in a fixed order.
pub struct ScriptedJudge {
    preference: Vec<Uuid>,
    failing: Mutex<Vec<FailingPair>>,
    fail_everything: bool,
    reject_credentials: bool,
    gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<(Uuid, Uuid)>>,
}

struct FailingPair {
    pair: (Uuid, Uuid),
    /// `None` fails forever.
    remaining: Option<usize>,
}

fn unordered(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a < b { (a, b) } else { (b, a) }
}

impl ScriptedJudge {
    pub fn preferring(preference: Vec<Uuid>) -> Self {
        Self {
            preference,
            failing: Mutex::new(Vec::new()),
            fail_everything: false,
            reject_credentials: false,
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_pair(self, a: Uuid, b: Uuid) -> Self {
        self.failing.lock().unwrap().push(FailingPair {
            pair: unordered(a, b),
            remaining: None,
        });
        self
    }

    pub fn flaky_pair(self, a: Uuid, b: Uuid) -> Self {
        self.failing.lock().unwrap().push(FailingPair {
            pair: unordered(a, b),
            remaining: Some(1),
        });
        self
    }

    pub fn failing_everything(mut self) -> Self {
        self.fail_everything = true;
        self
    }

    pub fn rejecting_credentials(mut self) -> Self {
        self.reject_credentials = true;
        self
    }

    /// Each comparison waits for a permit on `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Presentation order of every call, `(shown first, shown second)`.
    pub fn calls(&self) -> Vec<(Uuid, Uuid)> {
        self.calls.lock().unwrap().clone()
    }

    fn should_fail(&self, a: Uuid, b: Uuid) -> bool {
        let key = unordered(a, b);
        let mut failing = self.failing.lock().unwrap();
        match failing.iter_mut().find(|f| f.pair == key) {
            Some(FailingPair { remaining: None, .. }) => true,
            Some(FailingPair {
                remaining: Some(left),
                ..
            }) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }

    fn position(&self, id: Uuid) -> usize {
        self.preference
            .iter()
            .position(|p| *p == id)
            .unwrap_or(usize::MAX)
    }
}

#[async_trait]
impl Judge for ScriptedJudge {
    async fn compare(&self, _context: &JudgingContext, a: &Evidence, b: &Evidence) -> Result<Verdict> {
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.unwrap();
        }
        self.calls
            .lock()
            .unwrap()
            .push((a.submission_id, b.submission_id));

        if self.reject_credentials {
            return Err(EvaluatorError::JudgeAuth("invalid x-api-key".to_string()));
        }
        if self.fail_everything || self.should_fail(a.submission_id, b.submission_id) {
            return Err(EvaluatorError::JudgeUnavailable("overloaded".to_string()));
        }

        let (pos_a, pos_b) = (self.position(a.submission_id), self.position(b.submission_id));
        let winner = match pos_a.cmp(&pos_b) {
            std::cmp::Ordering::Less => Winner::A,
            std::cmp::Ordering::Greater => Winner::B,
            std::cmp::Ordering::Equal => Winner::Tie,
        };

        Ok(Verdict {
            winner,
            rationale: "Navigation is more complete.".to_string(),
            feedback_a: format!("Feedback for {}.", a.submission_id),
            feedback_b: format!("Feedback for {}.", b.submission_id),
            pros_cons_a: ProsCons::new(vec![format!("Strength of {}", a.submission_id)], vec![]),
            pros_cons_b: ProsCons::new(vec![format!("Strength of {}", b.submission_id)], vec![]),
        })
    }
}

/// Adds `count` submissions that are extracted and each own one stored frame.
pub async fn seed_extracted_submissions(
    store: &MemoryStore,
    files: &MemoryFileStore,
    task_id: Uuid,
    count: usize,
) -> Vec<Uuid> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let submission = store.insert_submission(
            task_id,
            &format!("Applicant{}", i),
            &format!("/videos/{}.mp4", i),
        );
        let id = submission.submission_id;
        let frame_path = format!("/frames/{}/frame_0000.jpg", id);
        files.write(Path::new(&frame_path), b"jpeg").await.unwrap();
        store
            .replace_frames(
                id,
                &[NewFrame {
                    position: 0,
                    path: frame_path,
                    timestamp_ms: 300,
                }],
            )
            .await
            .unwrap();
        store
            .set_extraction_status(id, ExtractionStatus::Completed, None)
            .await
            .unwrap();
        ids.push(id);
    }
    ids
}
