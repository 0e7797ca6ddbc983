//! Open subproblems of the search.

/// Side of a variable dichotomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDirection {
    /// `x <= floor(v)`.
    Down,
    /// `x >= ceil(v)`.
    Up,
}

/// Tightened domain `[lb, ub]` of one variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundChange {
    /// Column index.
    pub var: usize,
    /// Lower bound after the change.
    pub lb: f64,
    /// Upper bound after the change.
    pub ub: f64,
}

impl BoundChange {
    /// Keep `lb`, cap the variable at `floor(value)`.
    pub fn floor(var: usize, lb: f64, value: f64) -> Self {
        Self {
            var,
            lb,
            ub: value.floor(),
        }
    }

    /// Keep `ub`, lift the variable to `ceil(value)`.
    pub fn ceil(var: usize, ub: f64, value: f64) -> Self {
        Self {
            var,
            lb: value.ceil(),
            ub,
        }
    }

    /// The domain is empty.
    pub fn is_empty(&self) -> bool {
        self.lb > self.ub + 1e-9
    }
}

/// The dichotomy a node came from, kept so that its relaxation can be scored
/// against the parent's.
#[derive(Debug, Clone, Copy)]
pub struct BranchRecord {
    /// Column branched on.
    pub var: usize,
    /// Side taken.
    pub direction: BranchDirection,
    /// How far the parent's value sat from the new bound.
    pub distance: f64,
    /// Parent relaxation objective, minimization form.
    pub parent_obj: f64,
}

/// Subproblem defined by the bound changes on the path from the root.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Identifier, unique within a run; the root is 0.
    pub id: u64,
    /// Distance from the root.
    pub depth: usize,
    /// Changes to apply on top of the root bounds, outermost first.
    pub bound_changes: Vec<BoundChange>,
    /// Lower bound on every objective in the subtree.
    pub dual_bound: f64,
    /// `None` for the root.
    pub branch: Option<BranchRecord>,
}

impl SearchNode {
    /// The whole problem.
    pub fn root() -> Self {
        Self {
            id: 0,
            depth: 0,
            bound_changes: Vec::new(),
            dual_bound: f64::NEG_INFINITY,
            branch: None,
        }
    }

    /// Subproblem with `change` added, bounded below by `dual_bound`.
    pub fn child(&self, id: u64, change: BoundChange, branch: BranchRecord, dual_bound: f64) -> Self {
        let mut bound_changes = Vec::with_capacity(self.bound_changes.len() + 1);
        bound_changes.extend_from_slice(&self.bound_changes);
        bound_changes.push(change);
        Self {
            id,
            depth: self.depth + 1,
            bound_changes,
            dual_bound: self.dual_bound.max(dual_bound),
            branch: Some(branch),
        }
    }

    /// The last change emptied a domain.
    pub fn is_empty(&self) -> bool {
        self.bound_changes.last().is_some_and(BoundChange::is_empty)
    }

    /// Nothing in the subtree can beat `incumbent_obj`.
    pub fn can_prune(&self, incumbent_obj: f64) -> bool {
        self.dual_bound >= incumbent_obj - 1e-9
    }
}
