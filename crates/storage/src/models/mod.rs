mod comparison;
mod evaluation_run;
mod frame;
mod pros_cons;
mod status;
mod submission;
mod task;

pub use comparison::{ComparisonResult, NewComparison, RecordedComparison};
pub use evaluation_run::EvaluationRun;
pub use frame::{Frame, NewFrame};
pub use pros_cons::ProsCons;
pub use status::{EvaluationStatus, ExtractionStatus, RunStatus};
pub use submission::{RankingEntry, Submission};
pub use task::Task;
