pub mod criteria;
pub mod evaluation;
pub mod submission;
