//! Error types for robust portfolio selection.

use robust_mip::MipError;
use thiserror::Error;

/// Failures of the separation oracle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// `diag(σ) x` vanishes, so there is no worst-case direction
    #[error("Weighted deviation norm is zero")]
    DegenerateNorm,

    /// Candidate length does not match the uncertainty set
    #[error("Dimension mismatch: expected {expected} entries, got {found}")]
    DimensionMismatch {
        /// Number of assets in the uncertainty set
        expected: usize,
        /// Length of the candidate
        found: usize,
    },
}

/// Errors that can occur while running the robust portfolio loop.
#[derive(Error, Debug)]
pub enum PortfolioError {
    /// Problem data failed validation
    #[error("Invalid portfolio data: {0}")]
    InvalidData(String),

    /// The separation oracle failed on a candidate
    #[error("Separation oracle failed: {0}")]
    Oracle(#[from] OracleError),

    /// The master search failed
    #[error(transparent)]
    Mip(#[from] MipError),
}

/// Result type for portfolio operations.
pub type PortfolioResult<T> = Result<T, PortfolioError>;
