//! Choice of the variable to branch on.

use super::{BoundChange, BranchDirection};
use crate::model::MipProblem;
use crate::settings::BranchingRule;

/// Variable to split and the two resulting domains.
#[derive(Debug, Clone)]
pub struct BranchDecision {
    /// Column.
    pub var: usize,
    /// Its fractional relaxation value.
    pub value: f64,
    /// Domain of the `Down` child.
    pub down: BoundChange,
    /// Domain of the `Up` child.
    pub up: BoundChange,
}

/// Running mean of the objective degradation per unit of rounding.
#[derive(Debug, Clone, Copy)]
struct Pseudocost {
    mean: f64,
    samples: u64,
}

impl Pseudocost {
    fn record(&mut self, per_unit: f64) {
        let n = self.samples as f64;
        self.mean = (self.mean * n + per_unit) / (n + 1.0);
        self.samples += 1;
    }
}

/// Picks branching variables and learns pseudocosts from solved children.
pub struct BranchingSelector {
    rule: BranchingRule,
    down: Vec<Pseudocost>,
    up: Vec<Pseudocost>,
}

impl BranchingSelector {
    /// Selector for `num_vars` columns, every pseudocost at 1.
    pub fn new(rule: BranchingRule, num_vars: usize) -> Self {
        let unit = Pseudocost {
            mean: 1.0,
            samples: 0,
        };
        Self {
            rule,
            down: vec![unit; num_vars],
            up: vec![unit; num_vars],
        }
    }

    /// Seed unobserved pseudocosts with `|c_j|`, floored at 0.1.
    pub fn seed(&mut self, obj: &[f64]) {
        for ((d, u), c) in self.down.iter_mut().zip(self.up.iter_mut()).zip(obj) {
            let prior = c.abs().max(0.1);
            if d.samples == 0 {
                d.mean = prior;
            }
            if u.samples == 0 {
                u.mean = prior;
            }
        }
    }

    /// Branching decision at `x`, or `None` if every integer column is
    /// integral within `tol`.
    ///
    /// `bounds` gives the node-local domain of a column.
    pub fn select(
        &self,
        x: &[f64],
        prob: &MipProblem,
        bounds: impl Fn(usize) -> (f64, f64),
        tol: f64,
    ) -> Option<BranchDecision> {
        let score = |var: usize, value: f64| match self.rule {
            BranchingRule::MostFractional => MipProblem::fractionality(value),
            BranchingRule::Pseudocost => self.product_score(var, value),
        };

        let (var, value) = prob
            .fractional_vars(x, tol)
            .max_by(|&(i, vi), &(j, vj)| score(i, vi).total_cmp(&score(j, vj)))?;

        let (lb, ub) = bounds(var);
        Some(BranchDecision {
            var,
            value,
            down: BoundChange::floor(var, lb, value),
            up: BoundChange::ceil(var, ub, value),
        })
    }

    fn product_score(&self, var: usize, value: f64) -> f64 {
        let f = value - value.floor();
        let down = f * self.down[var].mean;
        let up = (1.0 - f) * self.up[var].mean;
        (down * up).max(1e-10)
    }

    /// Learn from a child whose relaxation moved the objective by `delta`
    /// after the variable was pushed `distance` away.
    ///
    /// Negative or non-finite changes are ignored.
    pub fn observe(&mut self, var: usize, direction: BranchDirection, distance: f64, delta: f64) {
        if distance <= 1e-6 || !delta.is_finite() || delta < 0.0 {
            return;
        }
        let cost = match direction {
            BranchDirection::Down => &mut self.down[var],
            BranchDirection::Up => &mut self.up[var],
        };
        cost.record(delta / distance);
    }

    /// Current `(down, up)` pseudocost of `var`.
    pub fn pseudocosts(&self, var: usize) -> (f64, f64) {
        (self.down[var].mean, self.up[var].mean)
    }

    /// Observations behind `pseudocosts(var)`.
    pub fn samples(&self, var: usize) -> (u64, u64) {
        (self.down[var].samples, self.up[var].samples)
    }
}
