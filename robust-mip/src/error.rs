//! Errors raised by the search.

use thiserror::Error;

/// Failure of a branch-and-bound run.
#[derive(Error, Debug)]
pub enum MipError {
    /// The model is malformed (bad bounds, unknown variable, NaN data).
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// The relaxation could not be solved.
    #[error("Master solve failed: {0}")]
    MasterSolveError(String),

    /// A candidate was rejected but no usable cut separates it.
    #[error("Cut generation failed: {0}")]
    CutGenerationError(String),

    /// The lazy-constraint handler returned an error.
    #[error("Lazy-constraint callback failed: {0}")]
    CallbackError(String),

    /// Broken search state.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// `Result` specialised to [`MipError`].
pub type MipResult<T> = Result<T, MipError>;
