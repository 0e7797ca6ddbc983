//! Explicit problem builder.
//!
//! Variables and constraints are accumulated in a [`ProblemBuilder`] value and
//! frozen into an immutable [`MipProblem`] that is handed to the search engine
//! only at solve time.

use sprs::TriMat;

use super::problem::MipProblem;
use crate::error::{MipError, MipResult};

/// Handle to a variable created by a [`ProblemBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Column index of the variable in the built problem.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    /// Real-valued variable.
    Continuous,
    /// Integer variable restricted to {0, 1}.
    Binary,
    /// General integer variable.
    Integer,
}

impl VarType {
    /// Whether branching may be required on this variable.
    pub fn is_integral(&self) -> bool {
        !matches!(self, VarType::Continuous)
    }
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveSense {
    /// Minimize the objective.
    #[default]
    Minimize,
    /// Maximize the objective.
    Maximize,
}

/// Relation between a linear expression and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// a^T x <= rhs
    Le,
    /// a^T x >= rhs
    Ge,
    /// a^T x == rhs
    Eq,
}

#[derive(Debug, Clone)]
struct VarDef {
    var_type: VarType,
    lb: f64,
    ub: f64,
    obj: f64,
}

#[derive(Debug, Clone)]
struct RowDef {
    terms: Vec<(usize, f64)>,
    sense: ConstraintSense,
    rhs: f64,
}

/// Accumulates variables and linear constraints for a mixed-integer program.
#[derive(Debug, Clone, Default)]
pub struct ProblemBuilder {
    sense: ObjectiveSense,
    vars: Vec<VarDef>,
    rows: Vec<RowDef>,
}

impl ProblemBuilder {
    /// Create an empty builder with the given objective sense.
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            sense,
            vars: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Add a continuous variable with bounds `[lb, ub]` and objective coefficient `obj`.
    ///
    /// Infinite bounds are allowed.
    pub fn add_continuous(&mut self, lb: f64, ub: f64, obj: f64) -> VarId {
        self.push_var(VarType::Continuous, lb, ub, obj)
    }

    /// Add a binary variable with objective coefficient `obj`.
    pub fn add_binary(&mut self, obj: f64) -> VarId {
        self.push_var(VarType::Binary, 0.0, 1.0, obj)
    }

    /// Add a general integer variable with bounds `[lb, ub]`.
    pub fn add_integer(&mut self, lb: f64, ub: f64, obj: f64) -> VarId {
        self.push_var(VarType::Integer, lb, ub, obj)
    }

    /// Add a linear constraint `sum(coef * var) <sense> rhs`.
    pub fn add_constraint(
        &mut self,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        sense: ConstraintSense,
        rhs: f64,
    ) {
        let terms = terms.into_iter().map(|(v, c)| (v.0, c)).collect();
        self.rows.push(RowDef { terms, sense, rhs });
    }

    /// Number of variables added so far.
    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// Number of constraints added so far.
    pub fn num_constraints(&self) -> usize {
        self.rows.len()
    }

    /// Validate and freeze the model.
    pub fn build(self) -> MipResult<MipProblem> {
        let n = self.vars.len();
        let m = self.rows.len();

        for (i, var) in self.vars.iter().enumerate() {
            if !var.obj.is_finite() {
                return Err(MipError::InvalidProblem(format!(
                    "Objective coefficient of variable {} is not finite",
                    i
                )));
            }
            if var.lb.is_nan() || var.ub.is_nan() || var.lb > var.ub {
                return Err(MipError::InvalidProblem(format!(
                    "Variable {} has empty domain [{}, {}]",
                    i, var.lb, var.ub
                )));
            }
        }

        let mut tri = TriMat::new((m, n));
        for (row_idx, row) in self.rows.iter().enumerate() {
            if !row.rhs.is_finite() {
                return Err(MipError::InvalidProblem(format!(
                    "Constraint {} has non-finite right-hand side",
                    row_idx
                )));
            }
            for &(col, val) in &row.terms {
                if col >= n {
                    return Err(MipError::InvalidProblem(format!(
                        "Constraint {} references variable {} but only {} variables",
                        row_idx, col, n
                    )));
                }
                if !val.is_finite() {
                    return Err(MipError::InvalidProblem(format!(
                        "Constraint {} has non-finite coefficient",
                        row_idx
                    )));
                }
                tri.add_triplet(row_idx, col, val);
            }
        }

        // Stored in minimization form
        let sign = match self.sense {
            ObjectiveSense::Minimize => 1.0,
            ObjectiveSense::Maximize => -1.0,
        };

        Ok(MipProblem {
            sense: self.sense,
            obj: self.vars.iter().map(|v| sign * v.obj).collect(),
            var_types: self.vars.iter().map(|v| v.var_type).collect(),
            var_lb: self.vars.iter().map(|v| v.lb).collect(),
            var_ub: self.vars.iter().map(|v| v.ub).collect(),
            rows: tri.to_csr(),
            row_sense: self.rows.iter().map(|r| r.sense).collect(),
            rhs: self.rows.iter().map(|r| r.rhs).collect(),
            integer_vars: (0..n).filter(|&i| self.vars[i].var_type.is_integral()).collect(),
            binary_vars: (0..n)
                .filter(|&i| self.vars[i].var_type == VarType::Binary)
                .collect(),
        })
    }

    fn push_var(&mut self, var_type: VarType, lb: f64, ub: f64, obj: f64) -> VarId {
        let id = VarId(self.vars.len());
        self.vars.push(VarDef {
            var_type,
            lb,
            ub,
            obj,
        });
        id
    }
}
