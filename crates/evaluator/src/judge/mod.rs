pub mod client;
pub mod parser;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::Path;
use storage::models::{Frame, ProsCons};
use uuid::Uuid;

use crate::Result;
use crate::traits::FileStore;

pub use client::{JudgeClient, JudgeConfig};
pub use parser::parse_verdict;

lazy_static! {
    /// Side labels as written by the judge, e.g. "Submission A".
    static ref SIDE_LABEL: Regex =
        Regex::new(r"\b((?i:submission|project|candidate)) ([AB])\b").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    A,
    B,
    Tie,
}

/// The judge's decision for one presentation of a pair. `A` is the side shown first.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub winner: Winner,
    pub rationale: String,
    pub feedback_a: String,
    pub feedback_b: String,
    pub pros_cons_a: ProsCons,
    pub pros_cons_b: ProsCons,
}

impl Verdict {
    /// The same verdict with the two sides exchanged.
    pub fn swapped(self) -> Self {
        Self {
            winner: match self.winner {
                Winner::A => Winner::B,
                Winner::B => Winner::A,
                Winner::Tie => Winner::Tie,
            },
            rationale: swap_labels(&self.rationale),
            feedback_a: swap_labels(&self.feedback_b),
            feedback_b: swap_labels(&self.feedback_a),
            pros_cons_a: swap_pros_cons_labels(&self.pros_cons_b),
            pros_cons_b: swap_pros_cons_labels(&self.pros_cons_a),
        }
    }
}

/// Exchanges "Submission A" and "Submission B" style labels in judge text.
fn swap_labels(text: &str) -> String {
    SIDE_LABEL
        .replace_all(text, |caps: &Captures| {
            let other = if &caps[2] == "A" { "B" } else { "A" };
            format!("{} {}", &caps[1], other)
        })
        .into_owned()
}

fn swap_pros_cons_labels(pros_cons: &ProsCons) -> ProsCons {
    ProsCons::new(
        pros_cons.pros.iter().map(|p| swap_labels(p)).collect(),
        pros_cons.cons.iter().map(|c| swap_labels(c)).collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: String,
    pub data: String,
}

/// A submission's frames, base64-encoded in capture order.
#[derive(Debug, Clone)]
pub struct Evidence {
    pub submission_id: Uuid,
    pub images: Vec<EncodedImage>,
}

impl Evidence {
    pub async fn load(files: &dyn FileStore, submission_id: Uuid, frames: &[Frame]) -> Result<Self> {
        let mut ordered: Vec<&Frame> = frames.iter().collect();
        ordered.sort_by_key(|frame| frame.position);

        let mut images = Vec::with_capacity(ordered.len());
        for frame in ordered {
            let path = Path::new(&frame.path);
            let bytes = files.read(path).await?;
            images.push(EncodedImage {
                media_type: media_type_for(path).to_string(),
                data: STANDARD.encode(bytes),
            });
        }

        Ok(Self {
            submission_id,
            images,
        })
    }
}

fn media_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

/// What the judge is told about the task, independent of the pair being compared.
#[derive(Debug, Clone, Default)]
pub struct JudgingContext {
    pub task_description: String,
    pub criteria: Vec<String>,
}

#[async_trait]
pub trait Judge: Send + Sync {
    async fn compare(&self, context: &JudgingContext, a: &Evidence, b: &Evidence) -> Result<Verdict>;
}
