//! Master backend contract: an LP relaxation that only ever gains rows.

use crate::error::MipResult;
use crate::model::MipProblem;

/// Outcome of one relaxation solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterStatus {
    /// Finite optimum found.
    Optimal,

    /// Empty feasible region under the current bounds and cuts.
    Infeasible,

    /// Objective unbounded below.
    Unbounded,

    /// The LP solver broke down (singular basis, cycling); nothing is known
    /// about the relaxation.
    NumericalFailure,
}

/// Relaxation solution in minimization form.
#[derive(Debug, Clone)]
pub struct MasterResult {
    /// Outcome.
    pub status: MasterStatus,

    /// Point; empty unless `Optimal`.
    pub x: Vec<f64>,

    /// Objective at `x`, `+inf` when infeasible, `-inf` when unbounded and
    /// NaN after a numerical failure.
    pub obj_val: f64,
}

impl MasterResult {
    /// Result for an empty relaxation.
    pub fn infeasible() -> Self {
        Self {
            status: MasterStatus::Infeasible,
            x: Vec::new(),
            obj_val: f64::INFINITY,
        }
    }

    /// Result for an unbounded relaxation.
    pub fn unbounded() -> Self {
        Self {
            status: MasterStatus::Unbounded,
            x: Vec::new(),
            obj_val: f64::NEG_INFINITY,
        }
    }

    /// Result for a solve that failed numerically.
    pub fn failed() -> Self {
        Self {
            status: MasterStatus::NumericalFailure,
            x: Vec::new(),
            obj_val: f64::NAN,
        }
    }
}

/// Where a cut came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutSource {
    /// Returned by the lazy-constraint handler.
    Lazy {
        /// Node whose candidate the cut rejected.
        node_id: u64,
    },

    /// Added to the backend directly.
    User,
}

/// Dense row `coefs · x <= rhs` over all problem variables.
#[derive(Debug, Clone)]
pub struct LinearCut {
    /// One coefficient per variable.
    pub coefs: Vec<f64>,

    /// Right-hand side.
    pub rhs: f64,

    /// Label shown in logs.
    pub name: Option<String>,

    /// Origin.
    pub source: CutSource,
}

impl LinearCut {
    /// Unnamed cut.
    pub fn new(coefs: Vec<f64>, rhs: f64, source: CutSource) -> Self {
        Self {
            coefs,
            rhs,
            name: None,
            source,
        }
    }

    /// Attach a label.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// `coefs · x - rhs`; positive when `x` is cut off.
    pub fn violation(&self, x: &[f64]) -> f64 {
        self.coefs.iter().zip(x).map(|(a, xi)| a * xi).sum::<f64>() - self.rhs
    }

    /// Violation strictly above `tol`.
    pub fn is_violated(&self, x: &[f64], tol: f64) -> bool {
        self.violation(x) > tol
    }

    /// Finite data and at least one nonzero coefficient.
    pub fn is_valid(&self) -> bool {
        self.rhs.is_finite()
            && self.coefs.iter().all(|c| c.is_finite())
            && self.coefs.iter().any(|c| c.abs() > 1e-12)
    }
}

/// LP relaxation driven by the branch-and-bound search.
///
/// Integrality is dropped. Cuts are appended and stay for the rest of the
/// run; bounds change per node and are restored with [`reset_bounds`].
///
/// [`reset_bounds`]: MasterBackend::reset_bounds
pub trait MasterBackend {
    /// Load `prob`, discarding cuts and bound changes from any earlier run.
    fn initialize(&mut self, prob: &MipProblem) -> MipResult<()>;

    /// Append `cut`; returns its index among the backend's cuts.
    fn add_cut(&mut self, cut: &LinearCut) -> usize;

    /// Override the bounds of one variable.
    fn set_var_bounds(&mut self, var: usize, lb: f64, ub: f64);

    /// Restore every variable to its bounds from `initialize`.
    fn reset_bounds(&mut self);

    /// Current `(lb, ub)` of a variable.
    fn var_bounds(&self, var: usize) -> (f64, f64);

    /// Solve the relaxation under the current bounds and cuts.
    ///
    /// A breakdown of the LP algorithm is reported as
    /// [`MasterStatus::NumericalFailure`], not as an error.
    fn solve(&mut self) -> MipResult<MasterResult>;

    /// Cuts appended so far.
    fn num_cuts(&self) -> usize;

    /// Columns in the relaxation.
    fn num_vars(&self) -> usize;
}
