//! Progress reporting for the cleaning pipeline.
//!
//! The pipeline emits one [`ProgressUpdate`] as each stage starts, then a
//! final `Complete` or `Failed` update. Overall progress is the stage's start
//! offset plus its share of the run scaled by `stage_progress`.
//!
//! ```rust,ignore
//! let outcome = Pipeline::builder()
//!     .on_progress(|u| eprintln!("{:>3.0}% {}", u.progress * 100.0, u.stage.display_name()))
//!     .build()?
//!     .run(df)?;
//! ```

use serde::{Deserialize, Serialize};

/// Where the run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    Initializing,
    /// Selecting required columns and coercing their types.
    SchemaEnforcement,
    /// Deduplicating rows and applying missing-value strategies.
    MissingValues,
    /// Replacing z-score outliers.
    OutlierSubstitution,
    Complete,
    Failed,
}

/// `(start, share)` of each working stage, in run order.
const STAGE_SPANS: [(CleaningStage, f32, f32); 4] = [
    (CleaningStage::Initializing, 0.0, 0.05),
    (CleaningStage::SchemaEnforcement, 0.05, 0.30),
    (CleaningStage::MissingValues, 0.35, 0.40),
    (CleaningStage::OutlierSubstitution, 0.75, 0.25),
];

impl CleaningStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::SchemaEnforcement => "Enforcing Schema",
            Self::MissingValues => "Resolving Missing Values",
            Self::OutlierSubstitution => "Substituting Outliers",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run spent in this stage. Zero for terminal stages.
    pub fn weight(&self) -> f32 {
        self.span().map_or(0.0, |(_, share)| share)
    }

    /// Overall progress when this stage begins.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Complete => 1.0,
            Self::Failed => 0.0,
            _ => self.span().map_or(0.0, |(start, _)| start),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    fn span(&self) -> Option<(f32, f32)> {
        STAGE_SPANS
            .iter()
            .find(|(stage, _, _)| stage == self)
            .map(|&(_, start, share)| (start, share))
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: CleaningStage,
    /// Whole-run progress, 0.0 to 1.0.
    pub progress: f32,
    /// Progress inside `stage`, 0.0 to 1.0.
    pub stage_progress: f32,
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: CleaningStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let stage_progress = stage_progress.clamp(0.0, 1.0);
        Self {
            stage,
            progress: (stage.base_progress() + stage.weight() * stage_progress).clamp(0.0, 1.0),
            stage_progress,
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::terminal(CleaningStage::Complete, message)
    }

    /// A `Failed` update; overall progress resets to zero.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::terminal(CleaningStage::Failed, message)
    }

    fn terminal(stage: CleaningStage, message: impl Into<String>) -> Self {
        let progress = stage.base_progress();
        Self {
            stage,
            progress,
            stage_progress: progress,
            message: message.into(),
        }
    }
}

/// Receiver for pipeline progress.
///
/// A pipeline holding a reporter may be moved to another thread, so
/// implementations must be `Send + Sync`. `report` is called on the thread
/// running the pipeline and should return quickly.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
