//! Problem construction and solution types for the MIP search.

mod builder;
mod problem;
mod solution;

pub use builder::{ConstraintSense, ObjectiveSense, ProblemBuilder, VarId, VarType};
pub use problem::MipProblem;
pub use solution::{IncumbentTracker, MipSolution, MipStatus};
