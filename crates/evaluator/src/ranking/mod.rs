pub mod aggregator;
pub mod feedback;

pub use aggregator::{RankingAggregator, Tally, percentile};
pub use feedback::synthesize_feedback;
