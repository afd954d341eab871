use std::cmp::Ordering;
use std::collections::HashMap;
use storage::models::{ComparisonResult, RankingEntry};
use uuid::Uuid;

use super::feedback::synthesize_feedback;

/// Pairwise record of one submission within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
    /// Includes degraded pairs.
    pub ties: u32,
    pub degraded: u32,
}

impl Tally {
    pub fn decided(&self) -> u32 {
        self.wins + self.losses
    }

    /// Win rate as an exact fraction; 1/2 when nothing was decided.
    fn win_rate(&self) -> (u64, u64) {
        match self.decided() {
            0 => (1, 2),
            decided => (self.wins as u64, decided as u64),
        }
    }

    fn cmp_win_rate(&self, other: &Tally) -> Ordering {
        let (a_num, a_den) = self.win_rate();
        let (b_num, b_den) = other.win_rate();
        (a_num * b_den).cmp(&(b_num * a_den))
    }
}

/// `round(100 * (n - rank) / (n - 1))`, or `None` for a field of one.
pub fn percentile(rank: u32, field_size: u32) -> Option<i32> {
    if field_size <= 1 {
        return None;
    }
    let above = field_size.saturating_sub(rank) as u64;
    let span = (field_size - 1) as u64;
    Some(((200 * above + span) / (2 * span)).min(100) as i32)
}

pub struct RankingAggregator;

impl RankingAggregator {
    pub fn tally(submissions: &[Uuid], comparisons: &[ComparisonResult]) -> HashMap<Uuid, Tally> {
        let mut tallies: HashMap<Uuid, Tally> =
            submissions.iter().map(|id| (*id, Tally::default())).collect();

        for comparison in comparisons {
            let sides = [comparison.submission_low, comparison.submission_high];
            for side in sides {
                let Some(tally) = tallies.get_mut(&side) else {
                    continue;
                };
                match comparison.winner_id {
                    Some(winner) if winner == side => tally.wins += 1,
                    Some(_) => tally.losses += 1,
                    None => {
                        tally.ties += 1;
                        if comparison.degraded {
                            tally.degraded += 1;
                        }
                    }
                }
            }
        }
        tallies
    }

    /// Dense ranking on win rate. Equal win rates share a rank and percentile; wins,
    /// then fewer ties, then id only order the listing inside a rank.
    pub fn rank(submissions: &[Uuid], comparisons: &[ComparisonResult]) -> Vec<RankingEntry> {
        let tallies = Self::tally(submissions, comparisons);

        let mut ordered: Vec<(Uuid, Tally)> = tallies.into_iter().collect();
        ordered.sort_by(|(a_id, a), (b_id, b)| {
            b.cmp_win_rate(a)
                .then_with(|| b.wins.cmp(&a.wins))
                .then_with(|| a.ties.cmp(&b.ties))
                .then_with(|| a_id.cmp(b_id))
        });

        let field_size = ordered.len() as u32;
        let mut entries = Vec::with_capacity(ordered.len());
        let mut rank = 0u32;
        let mut previous: Option<Tally> = None;

        for (submission_id, tally) in ordered {
            if previous.is_none_or(|p| p.cmp_win_rate(&tally) != Ordering::Equal) {
                rank += 1;
            }
            previous = Some(tally);

            let (feedback, pros_cons) = synthesize_feedback(submission_id, &tally, comparisons);
            entries.push(RankingEntry {
                submission_id,
                rank: rank as i32,
                percentile: percentile(rank, field_size),
                wins: tally.wins as i32,
                losses: tally.losses as i32,
                ties: tally.ties as i32,
                feedback,
                pros_cons,
            });
        }

        entries
    }
}
