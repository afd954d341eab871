use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::ProsCons;

/// Outcome of judging one unordered pair within one run.
///
/// The pair is always stored in canonical order (`submission_low < submission_high`),
/// which is what makes the `(run, low, high)` key unique per unordered pair.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComparisonResult {
    pub comparison_id: Uuid,
    pub run_id: Uuid,
    pub submission_low: Uuid,
    pub submission_high: Uuid,
    /// `None` on a tie, including degraded pairs.
    pub winner_id: Option<Uuid>,
    pub rationale: String,
    pub feedback_low: String,
    pub feedback_high: String,
    pub pros_cons_low: ProsCons,
    pub pros_cons_high: ProsCons,
    /// The judge could not produce a verdict; recorded as a zero-confidence tie.
    pub degraded: bool,
    pub attempts: i32,
    pub created_at: chrono::NaiveDateTime,
}

impl ComparisonResult {
    pub fn involves(&self, submission_id: Uuid) -> bool {
        self.submission_low == submission_id || self.submission_high == submission_id
    }

    pub fn is_tie(&self) -> bool {
        self.winner_id.is_none()
    }

    pub fn opponent_of(&self, submission_id: Uuid) -> Option<Uuid> {
        if self.submission_low == submission_id {
            Some(self.submission_high)
        } else if self.submission_high == submission_id {
            Some(self.submission_low)
        } else {
            None
        }
    }

    /// Feedback and pros/cons written for the given side of the pair.
    pub fn side(&self, submission_id: Uuid) -> Option<(&str, &ProsCons)> {
        if self.submission_low == submission_id {
            Some((&self.feedback_low, &self.pros_cons_low))
        } else if self.submission_high == submission_id {
            Some((&self.feedback_high, &self.pros_cons_high))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewComparison {
    pub submission_low: Uuid,
    pub submission_high: Uuid,
    pub winner_id: Option<Uuid>,
    pub rationale: String,
    pub feedback_low: String,
    pub feedback_high: String,
    pub pros_cons_low: ProsCons,
    pub pros_cons_high: ProsCons,
    pub degraded: bool,
    pub attempts: i32,
}

/// Run counters after recording a comparison. `inserted` is false when the pair had
/// already been recorded, in which case the counters were left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedComparison {
    pub inserted: bool,
    pub completed_pairs: i32,
    pub degraded_pairs: i32,
}
