//! Master backend using the `microlp` simplex solver.
//!
//! The LP relaxation is rebuilt from the base rows, the current bounds and
//! every cut on each solve. Integrality is relaxed and enforced by branching.

use microlp::{ComparisonOp, OptimizationDirection, Problem, Variable};

use super::{LinearCut, MasterBackend, MasterResult, MasterStatus};
use crate::error::{MipError, MipResult};
use crate::model::{ConstraintSense, MipProblem};

/// Master backend using a dense-rebuild simplex LP.
#[derive(Debug, Default)]
pub struct MicroLpBackend {
    /// Base problem (rows, objective, root bounds).
    base: Option<MipProblem>,

    /// Cuts in insertion order.
    cuts: Vec<LinearCut>,

    /// Current variable lower bounds.
    var_lb: Vec<f64>,

    /// Current variable upper bounds.
    var_ub: Vec<f64>,

    /// Number of LP solves performed.
    solves: u64,
}

impl MicroLpBackend {
    /// Create an uninitialized backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of LP solves performed since `initialize`.
    pub fn num_solves(&self) -> u64 {
        self.solves
    }

    fn build_lp(&self, base: &MipProblem) -> Option<(Problem, Vec<Variable>)> {
        let mut lp = Problem::new(OptimizationDirection::Minimize);

        let vars: Vec<Variable> = (0..base.num_vars())
            .map(|j| lp.add_var(base.obj[j], (self.var_lb[j], self.var_ub[j])))
            .collect();

        for (row_idx, row) in base.rows.outer_iterator().enumerate() {
            let terms: Vec<(Variable, f64)> = row
                .iter()
                .filter(|(_, val)| **val != 0.0)
                .map(|(col, &val)| (vars[col], val))
                .collect();
            let sense = base.row_sense[row_idx];
            let rhs = base.rhs[row_idx];

            if terms.is_empty() {
                // 0 <sense> rhs: either always true or the LP is infeasible
                let holds = match sense {
                    ConstraintSense::Le => 0.0 <= rhs,
                    ConstraintSense::Ge => 0.0 >= rhs,
                    ConstraintSense::Eq => rhs == 0.0,
                };
                if !holds {
                    return None;
                }
                continue;
            }

            lp.add_constraint(terms, comparison_op(sense), rhs);
        }

        // Cut rows enter with unit Euclidean norm
        for cut in &self.cuts {
            let norm = cut.coefs.iter().map(|c| c * c).sum::<f64>().sqrt();
            if norm <= 1e-12 {
                continue;
            }
            let terms: Vec<(Variable, f64)> = cut
                .coefs
                .iter()
                .enumerate()
                .filter(|(_, c)| **c != 0.0)
                .map(|(j, &c)| (vars[j], c / norm))
                .collect();
            lp.add_constraint(terms, ComparisonOp::Le, cut.rhs / norm);
        }

        Some((lp, vars))
    }
}

fn comparison_op(sense: ConstraintSense) -> ComparisonOp {
    match sense {
        ConstraintSense::Le => ComparisonOp::Le,
        ConstraintSense::Ge => ComparisonOp::Ge,
        ConstraintSense::Eq => ComparisonOp::Eq,
    }
}

impl MasterBackend for MicroLpBackend {
    fn initialize(&mut self, prob: &MipProblem) -> MipResult<()> {
        if prob.num_vars() == 0 {
            return Err(MipError::InvalidProblem("Problem has no variables".to_string()));
        }
        self.var_lb = prob.var_lb.clone();
        self.var_ub = prob.var_ub.clone();
        self.cuts.clear();
        self.solves = 0;
        self.base = Some(prob.clone());
        Ok(())
    }

    fn add_cut(&mut self, cut: &LinearCut) -> usize {
        self.cuts.push(cut.clone());
        self.cuts.len() - 1
    }

    fn set_var_bounds(&mut self, var: usize, lb: f64, ub: f64) {
        self.var_lb[var] = lb;
        self.var_ub[var] = ub;
    }

    fn reset_bounds(&mut self) {
        if let Some(base) = &self.base {
            self.var_lb.clone_from(&base.var_lb);
            self.var_ub.clone_from(&base.var_ub);
        }
    }

    fn var_bounds(&self, var: usize) -> (f64, f64) {
        (self.var_lb[var], self.var_ub[var])
    }

    fn solve(&mut self) -> MipResult<MasterResult> {
        self.solves += 1;

        let base = self.base.as_ref().ok_or_else(|| {
            MipError::InternalError("Master backend not initialized".to_string())
        })?;

        if self
            .var_lb
            .iter()
            .zip(&self.var_ub)
            .any(|(lb, ub)| *lb > *ub + 1e-9)
        {
            return Ok(MasterResult::infeasible());
        }

        let Some((lp, vars)) = self.build_lp(base) else {
            return Ok(MasterResult::infeasible());
        };

        match lp.solve() {
            Ok(solution) => {
                let x: Vec<f64> = vars.iter().map(|&v| solution[v]).collect();
                Ok(MasterResult {
                    status: MasterStatus::Optimal,
                    obj_val: solution.objective(),
                    x,
                })
            }
            Err(microlp::Error::Infeasible) => Ok(MasterResult::infeasible()),
            Err(microlp::Error::Unbounded) => Ok(MasterResult::unbounded()),
            Err(e) => {
                log::debug!("microlp failed with {} cuts: {}", self.cuts.len(), e);
                Ok(MasterResult::failed())
            }
        }
    }

    fn num_cuts(&self) -> usize {
        self.cuts.len()
    }

    fn num_vars(&self) -> usize {
        self.var_lb.len()
    }
}
