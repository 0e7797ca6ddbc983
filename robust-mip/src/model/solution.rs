//! Search outcomes and incumbent bookkeeping.

/// How the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipStatus {
    /// Every node was closed and an incumbent exists.
    Optimal,

    /// Nothing satisfies the rows, the bounds and the lazy cuts.
    Infeasible,

    /// The root relaxation has no finite optimum.
    Unbounded,

    /// `max_nodes` nodes were solved before the tree closed.
    NodeLimit,

    /// The wall-clock budget ran out.
    TimeLimit,

    /// Incumbent and bound met within `gap_tol` / `gap_abs_tol`.
    GapLimit,

    /// The tree closed, but subtrees whose relaxation failed numerically
    /// were dropped and might hold a better point.
    NumericalFailure,
}

impl MipStatus {
    /// Optimal, possibly up to the gap tolerance.
    pub fn is_optimal(&self) -> bool {
        matches!(self, MipStatus::Optimal | MipStatus::GapLimit)
    }

    /// Stopped before optimality could be proven; any incumbent is the best
    /// point found.
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            MipStatus::NodeLimit | MipStatus::TimeLimit | MipStatus::NumericalFailure
        )
    }
}

/// Result of a search, reported in the caller's objective sense.
#[derive(Debug, Clone)]
pub struct MipSolution {
    /// How the search ended.
    pub status: MipStatus,

    /// Incumbent point; empty when none was accepted.
    pub x: Vec<f64>,

    /// Incumbent objective.
    pub obj_val: f64,

    /// Best bound on the objective over the open tree.
    pub bound: f64,

    /// Relative distance between `obj_val` and `bound`.
    pub gap: f64,

    /// Relaxations solved (re-solves after lazy cuts count once).
    pub nodes_explored: u64,

    /// Nodes discarded by bound or by an empty domain.
    pub nodes_pruned: u64,

    /// Nodes dropped after their relaxation failed numerically.
    pub nodes_abandoned: u64,

    /// Lazy cuts installed in the master.
    pub cuts_added: u64,

    /// Candidates handed to the lazy-constraint handler.
    pub lazy_calls: u64,

    /// Wall time.
    pub solve_time_ms: u64,

    /// Times the incumbent improved.
    pub incumbent_updates: u64,
}

impl Default for MipSolution {
    fn default() -> Self {
        Self {
            status: MipStatus::Infeasible,
            x: Vec::new(),
            obj_val: f64::INFINITY,
            bound: f64::NEG_INFINITY,
            gap: f64::INFINITY,
            nodes_explored: 0,
            nodes_pruned: 0,
            nodes_abandoned: 0,
            cuts_added: 0,
            lazy_calls: 0,
            solve_time_ms: 0,
            incumbent_updates: 0,
        }
    }
}

impl MipSolution {
    /// True if an incumbent point is attached.
    pub fn has_solution(&self) -> bool {
        !self.x.is_empty()
    }

    /// `|primal - dual| / max(|primal|, 1e-10)`, infinite if either side is.
    pub fn compute_gap(primal: f64, dual: f64) -> f64 {
        if !(primal.is_finite() && dual.is_finite()) {
            return f64::INFINITY;
        }
        (primal - dual).abs() / primal.abs().max(1e-10)
    }
}

/// Best accepted candidate, in minimization form.
#[derive(Debug, Clone)]
pub struct IncumbentTracker {
    /// Incumbent point.
    pub solution: Option<Vec<f64>>,

    /// Incumbent objective; `+inf` until a candidate is accepted.
    pub obj_val: f64,

    /// Improvements so far.
    pub update_count: u64,
}

impl Default for IncumbentTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IncumbentTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self {
            solution: None,
            obj_val: f64::INFINITY,
            update_count: 0,
        }
    }

    /// Whether a candidate has been accepted.
    pub fn has_incumbent(&self) -> bool {
        self.solution.is_some()
    }

    /// Replace the incumbent if `obj` improves it by more than 1e-9.
    pub fn update(&mut self, x: &[f64], obj: f64) -> bool {
        if obj >= self.obj_val - 1e-9 {
            return false;
        }
        self.solution = Some(x.to_vec());
        self.obj_val = obj;
        self.update_count += 1;
        true
    }

    /// Relative gap to `dual_bound`.
    pub fn gap(&self, dual_bound: f64) -> f64 {
        MipSolution::compute_gap(self.obj_val, dual_bound)
    }
}
