pub mod pairs;
pub mod scheduler;

pub use pairs::{all_pairs, pair_count};
pub use scheduler::{RunOutcome, SchedulerConfig, StartedRun, TournamentScheduler};
