//! Frozen mixed-integer program.

use sprs::CsMat;

use super::builder::{ConstraintSense, ObjectiveSense, VarType};

/// Mixed-integer linear program, produced by [`super::ProblemBuilder::build`].
///
/// `obj` is always in minimization form. A maximization model stores the
/// negated coefficients and reports values back through
/// [`to_user_objective`](Self::to_user_objective).
#[derive(Debug, Clone)]
pub struct MipProblem {
    /// Direction requested by the caller.
    pub sense: ObjectiveSense,

    /// Minimization-form objective.
    pub obj: Vec<f64>,

    /// Domain per column.
    pub var_types: Vec<VarType>,

    /// Column lower bounds.
    pub var_lb: Vec<f64>,

    /// Column upper bounds.
    pub var_ub: Vec<f64>,

    /// Row coefficients, `m x n` CSR.
    pub rows: CsMat<f64>,

    /// Relation per row.
    pub row_sense: Vec<ConstraintSense>,

    /// Right-hand side per row.
    pub rhs: Vec<f64>,

    /// Binary and general integer columns.
    pub integer_vars: Vec<usize>,

    /// Binary columns only.
    pub binary_vars: Vec<usize>,
}

impl MipProblem {
    /// Columns.
    pub fn num_vars(&self) -> usize {
        self.obj.len()
    }

    /// Rows.
    pub fn num_constraints(&self) -> usize {
        self.rhs.len()
    }

    /// Integer columns, binaries included.
    pub fn num_integers(&self) -> usize {
        self.integer_vars.len()
    }

    /// `obj · x`, minimization form.
    pub fn internal_objective(&self, x: &[f64]) -> f64 {
        self.obj.iter().zip(x).map(|(c, v)| c * v).sum()
    }

    /// Map a minimization-form value back to the caller's direction.
    pub fn to_user_objective(&self, internal: f64) -> f64 {
        match self.sense {
            ObjectiveSense::Minimize => internal,
            ObjectiveSense::Maximize => -internal,
        }
    }

    /// Distance from `value` to the nearest integer.
    pub fn fractionality(value: f64) -> f64 {
        (value - value.round()).abs()
    }

    /// Every integer column lies within `tol` of an integer.
    pub fn is_integer_feasible(&self, x: &[f64], tol: f64) -> bool {
        self.fractional_vars(x, tol).next().is_none()
    }

    /// Integer columns farther than `tol` from an integer, with their values.
    pub fn fractional_vars<'a>(
        &'a self,
        x: &'a [f64],
        tol: f64,
    ) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.integer_vars
            .iter()
            .map(move |&j| (j, x[j]))
            .filter(move |&(_, v)| Self::fractionality(v) > tol)
    }

    /// Snap integer columns to the nearest integer.
    pub fn round_integers(&self, x: &mut [f64]) {
        for &j in &self.integer_vars {
            x[j] = x[j].round();
        }
    }

    /// `x` lies in the column box, up to `tol`.
    pub fn satisfies_bounds(&self, x: &[f64], tol: f64) -> bool {
        x.len() == self.num_vars()
            && x
                .iter()
                .zip(self.var_lb.iter().zip(&self.var_ub))
                .all(|(&v, (&lb, &ub))| v >= lb - tol && v <= ub + tol)
    }

    /// Largest row violation at `x`; zero when every row holds.
    pub fn constraint_violation(&self, x: &[f64]) -> f64 {
        self.rows
            .outer_iterator()
            .zip(self.row_sense.iter().zip(&self.rhs))
            .map(|(row, (sense, &rhs))| {
                let lhs: f64 = row.iter().map(|(j, &a)| a * x[j]).sum();
                match sense {
                    ConstraintSense::Le => lhs - rhs,
                    ConstraintSense::Ge => rhs - lhs,
                    ConstraintSense::Eq => (lhs - rhs).abs(),
                }
            })
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::super::ProblemBuilder;
    use super::*;

    /// min b + c  s.t. b + c >= 1, b binary, c in [0, 10].
    fn cover() -> MipProblem {
        let mut pb = ProblemBuilder::new(ObjectiveSense::Minimize);
        let b = pb.add_binary(1.0);
        let c = pb.add_continuous(0.0, 10.0, 1.0);
        pb.add_constraint([(b, 1.0), (c, 1.0)], ConstraintSense::Ge, 1.0);
        pb.build().unwrap()
    }

    #[test]
    fn test_integrality() {
        let prob = cover();
        assert!(prob.is_integer_feasible(&[1.0, 0.5], 1e-6));
        assert!(prob.is_integer_feasible(&[0.9999999, 0.5], 1e-6));
        assert!(!prob.is_integer_feasible(&[0.5, 0.5], 1e-6));

        let frac: Vec<_> = prob.fractional_vars(&[0.25, 0.5], 1e-6).collect();
        assert_eq!(frac, vec![(0, 0.25)]);

        let mut x = [0.9999999, 0.5];
        prob.round_integers(&mut x);
        assert_eq!(x, [1.0, 0.5]);
    }

    #[test]
    fn test_fractionality_is_symmetric() {
        assert!((MipProblem::fractionality(0.3) - 0.3).abs() < 1e-12);
        assert!((MipProblem::fractionality(0.7) - 0.3).abs() < 1e-12);
        assert!((MipProblem::fractionality(-1.25) - 0.25).abs() < 1e-12);
        assert_eq!(MipProblem::fractionality(2.0), 0.0);
    }

    #[test]
    fn test_feasibility_measures() {
        let prob = cover();
        assert_eq!(prob.constraint_violation(&[1.0, 0.0]), 0.0);
        assert!((prob.constraint_violation(&[0.0, 0.25]) - 0.75).abs() < 1e-12);
        assert!(prob.satisfies_bounds(&[1.0, 0.0], 1e-9));
        assert!(!prob.satisfies_bounds(&[1.0, -1.0], 1e-9));
        assert!(!prob.satisfies_bounds(&[1.0], 1e-9));
    }

    #[test]
    fn test_maximize_reports_negated_values() {
        let mut pb = ProblemBuilder::new(ObjectiveSense::Maximize);
        let v = pb.add_binary(3.0);
        let prob = pb.build().unwrap();

        assert_eq!(prob.internal_objective(&[1.0]), -3.0);
        assert_eq!(prob.to_user_objective(-3.0), 3.0);
        assert_eq!(v.index(), 0);
    }
}
