//! Robust portfolio selection with lazy worst-case cuts.
//!
//! Chooses at most `K` of `N` assets and their weights to maximise the
//! worst-case return over an ellipsoidal uncertainty set. The worst case is
//! enforced lazily: the master search in [`robust_mip`] proposes
//! integer-feasible allocations, and a [`SeparationOracle`] either certifies
//! them or returns a robust cut `z <= worst_p · x`.
//!
//! ```ignore
//! let data = PortfolioData::generated(20, 1.5)?;
//! let report = RobustPortfolioSolver::new(data, RobustConfig::default())?.run()?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod oracle;
pub mod orchestrator;
pub mod policy;
pub mod uncertainty;

pub use error::{OracleError, PortfolioError, PortfolioResult};
pub use oracle::{
    ClosedFormMinimizer, ProjectedGradientMinimizer, RobustCut, Separation, SeparationOracle,
    UncertaintyMinimizer, WorstCase,
};
pub use orchestrator::{
    Allocation, CandidateRecord, MasterVars, RobustConfig, RobustPortfolioSolver, RobustReport,
    RunOutcome, RunStats,
};
pub use policy::{CutAcceptancePolicy, DEFAULT_EPSILON};
pub use uncertainty::{PortfolioData, UncertaintySet};
