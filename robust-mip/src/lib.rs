//! Mixed-integer linear programming with lazy constraints.
//!
//! The search is a best-bound branch-and-bound over an LP master problem.
//! Whenever a node relaxation produces an integer-feasible point, the search
//! suspends and passes the candidate to a [`LazyConstraintHandler`], which may
//! reject it by buffering linear cuts. Cuts are appended to an append-only
//! [`CutPool`] and to the master, and the node is re-solved. A candidate that
//! survives the handler becomes an incumbent.
//!
//! ```ignore
//! let mut b = ProblemBuilder::new(ObjectiveSense::Maximize);
//! let x = b.add_binary(1.0);
//! let prob = b.build()?;
//! let sol = solve_mip(&prob, &MipSettings::default(), &mut NoLazyConstraints)?;
//! ```

#![warn(missing_docs)]

pub mod cuts;
pub mod error;
pub mod lazy;
pub mod master;
pub mod model;
pub mod search;
pub mod settings;
pub mod solver;

pub use cuts::{CutPool, CutPoolStats, PooledCut};
pub use error::{MipError, MipResult};
pub use lazy::{CandidateContext, LazyConstraintHandler, NoLazyConstraints};
pub use master::{CutSource, LinearCut, MasterBackend, MasterResult, MasterStatus, MicroLpBackend};
pub use model::{
    ConstraintSense, IncumbentTracker, MipProblem, MipSolution, MipStatus, ObjectiveSense,
    ProblemBuilder, VarId, VarType,
};
pub use settings::{BranchingRule, MipSettings, NodeSelection};
pub use solver::{solve_mip, MipSolver};
