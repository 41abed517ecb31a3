//! Pipeline stage sequence.

use std::fmt;

/// The states a pipeline instance moves through.
///
/// State only advances forward through this fixed order; it never skips
/// (except `ReducingDimensions` when no reducer is configured) and never
/// regresses except via an explicit reset to `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Ready,
    LoadingImages,
    PreprocessingImages,
    GeneratingFeatures,
    PerformingClustering,
    ReducingDimensions,
    Completed,
}

impl PipelineState {
    /// Successor in the fixed stage order.
    pub fn next(self) -> PipelineState {
        match self {
            PipelineState::Ready => PipelineState::LoadingImages,
            PipelineState::LoadingImages => PipelineState::PreprocessingImages,
            PipelineState::PreprocessingImages => PipelineState::GeneratingFeatures,
            PipelineState::GeneratingFeatures => PipelineState::PerformingClustering,
            PipelineState::PerformingClustering => PipelineState::ReducingDimensions,
            PipelineState::ReducingDimensions => PipelineState::Completed,
            PipelineState::Completed => PipelineState::Completed,
        }
    }

    /// True for the two states with no work in flight.
    pub fn is_idle(self) -> bool {
        matches!(self, PipelineState::Ready | PipelineState::Completed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Ready => "ready",
            PipelineState::LoadingImages => "loading images",
            PipelineState::PreprocessingImages => "preprocessing images",
            PipelineState::GeneratingFeatures => "generating features",
            PipelineState::PerformingClustering => "performing clustering",
            PipelineState::ReducingDimensions => "reducing dimensions",
            PipelineState::Completed => "completed",
        };
        f.write_str(name)
    }
}
