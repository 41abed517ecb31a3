//! Error taxonomy for the clustering pipeline.
//!
//! Usage errors (calling the API in the wrong state, invalid parameters) are
//! typed variants reported synchronously. Collaborator failures from worker
//! threads and background tasks are captured at the join point and carried
//! inside [`Error::StageFailed`].

use crate::pipeline::PipelineState;
use thiserror::Error;

/// Errors surfaced by the pipeline driver API.
#[derive(Debug, Error)]
pub enum Error {
    /// An API call was made while the pipeline was in an incompatible state.
    #[error("`{operation}` is not allowed while the pipeline is {state}")]
    InvalidState {
        operation: &'static str,
        state: PipelineState,
    },

    /// `start` was called with a zero thread count.
    #[error("thread count must be greater than zero")]
    ZeroThreads,

    /// `start` was called before any input paths were supplied.
    #[error("input set is empty")]
    EmptyInput,

    /// A chunk plan was requested for an empty input.
    #[error("cannot plan chunks for an empty input")]
    EmptyPlan,

    /// Reduced features were requested from a pipeline built without a
    /// dimensionality reduction algorithm.
    #[error("no dimensionality reduction algorithm was configured")]
    NoReducerConfigured,

    /// The pipeline was halted by an earlier stage failure; only `reset`
    /// (or dropping the pipeline) is useful from here.
    #[error("pipeline halted by an earlier failure during {stage}")]
    Halted { stage: PipelineState },

    /// A worker or background task failed; the stage does not resume.
    #[error("{stage} stage failed: {error:#}")]
    StageFailed {
        stage: PipelineState,
        error: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
