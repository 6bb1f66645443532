//! Pipeline module.
//!
//! The cleaning stages and the `Pipeline` that runs them in order.

mod builder;
pub mod missing;
pub mod outliers;
pub mod progress;

pub use builder::{CleaningOutcome, Pipeline, PipelineBuilder};
pub use missing::MissingValueResolver;
pub use outliers::OutlierSubstitution;
pub use progress::{ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate};
