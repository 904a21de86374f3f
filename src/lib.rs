pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod stats;

pub use analyzers::aggregate::RollupAggregator;
pub use analyzers::analyzer::Gradebook;
pub use analyzers::types::{Category, ClassAverage, GradeRecord, ScoreEntry, WeightedResult, Weights};
pub use error::{GradebookError, GradebookResult};
pub use stats::PopulationStats;
