//! Lazy-constraint callback contract.
//!
//! The search suspends whenever a node relaxation yields an integer-feasible
//! point and hands a [`CandidateContext`] to the registered
//! [`LazyConstraintHandler`]. The handler reads the candidate and may buffer
//! linear cuts; the search blocks until it returns. Buffered cuts are appended
//! to the master and the same node is re-solved. An empty buffer accepts the
//! candidate.

use crate::error::{MipError, MipResult};
use crate::master::{CutSource, LinearCut};
use crate::model::VarId;

/// Snapshot of an integer-feasible candidate plus a buffer for lazy cuts.
#[derive(Debug)]
pub struct CandidateContext<'a> {
    values: &'a [f64],
    objective: f64,
    node_id: u64,
    round: u64,
    pending: Vec<LinearCut>,
}

impl<'a> CandidateContext<'a> {
    /// Create a context for a candidate.
    ///
    /// `objective` is in the caller's sense.
    pub fn new(values: &'a [f64], objective: f64, node_id: u64, round: u64) -> Self {
        Self {
            values,
            objective,
            node_id,
            round,
            pending: Vec::new(),
        }
    }

    /// All variable values of the candidate.
    pub fn values(&self) -> &[f64] {
        self.values
    }

    /// Value of a single variable.
    ///
    /// # Panics
    ///
    /// Panics if `var` does not belong to the problem being solved.
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.index()]
    }

    /// Values of several variables, in the given order.
    pub fn values_of(&self, vars: &[VarId]) -> Vec<f64> {
        vars.iter().map(|&v| self.value(v)).collect()
    }

    /// Candidate objective value (caller's sense).
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Node at which the candidate was found.
    pub fn node_id(&self) -> u64 {
        self.node_id
    }

    /// Callback invocation counter for this run (starts at 1).
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Buffer a lazy cut `sum(coef * var) <= rhs`.
    ///
    /// Fails with [`MipError::InvalidProblem`] if a variable does not belong
    /// to the problem being solved; nothing is buffered then.
    pub fn add_lazy(
        &mut self,
        terms: impl IntoIterator<Item = (VarId, f64)>,
        rhs: f64,
    ) -> MipResult<()> {
        let n = self.values.len();
        let mut coefs = vec![0.0; n];
        for (var, coef) in terms {
            let slot = coefs.get_mut(var.index()).ok_or_else(|| {
                MipError::InvalidProblem(format!(
                    "lazy cut references variable {} but the candidate has {} values",
                    var.index(),
                    n
                ))
            })?;
            *slot += coef;
        }
        self.pending
            .push(LinearCut::new(coefs, rhs, CutSource::Lazy { node_id: self.node_id }));
        Ok(())
    }

    /// Buffer a prebuilt dense cut.
    pub fn add_lazy_cut(&mut self, cut: LinearCut) {
        self.pending.push(cut);
    }

    /// Number of buffered cuts.
    pub fn num_pending(&self) -> usize {
        self.pending.len()
    }

    /// Take the buffered cuts, leaving the buffer empty.
    pub fn take_cuts(&mut self) -> Vec<LinearCut> {
        std::mem::take(&mut self.pending)
    }
}

/// Receives integer-feasible candidates during the search.
pub trait LazyConstraintHandler {
    /// Inspect a candidate and buffer any violated cuts.
    ///
    /// Returning an error aborts the solve.
    fn on_candidate(&mut self, ctx: &mut CandidateContext<'_>) -> MipResult<()>;
}

impl<F> LazyConstraintHandler for F
where
    F: FnMut(&mut CandidateContext<'_>) -> MipResult<()>,
{
    fn on_candidate(&mut self, ctx: &mut CandidateContext<'_>) -> MipResult<()> {
        self(ctx)
    }
}

/// Handler that accepts every candidate.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLazyConstraints;

impl LazyConstraintHandler for NoLazyConstraints {
    fn on_candidate(&mut self, _ctx: &mut CandidateContext<'_>) -> MipResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_reads_and_buffers() {
        let values = [0.25, 1.0, 3.0];
        let mut ctx = CandidateContext::new(&values, 3.0, 7, 1);

        assert_eq!(ctx.value(VarId(2)), 3.0);
        assert_eq!(ctx.values_of(&[VarId(1), VarId(0)]), vec![1.0, 0.25]);
        assert_eq!(ctx.node_id(), 7);

        ctx.add_lazy([(VarId(2), 1.0), (VarId(0), -2.0), (VarId(2), 1.0)], 0.5)
            .unwrap();
        assert_eq!(ctx.num_pending(), 1);

        let cuts = ctx.take_cuts();
        assert_eq!(cuts[0].coefs, vec![-2.0, 0.0, 2.0]);
        assert_eq!(cuts[0].source, CutSource::Lazy { node_id: 7 });
        assert_eq!(ctx.num_pending(), 0);
    }

    #[test]
    fn test_cut_on_foreign_variable_is_rejected() {
        let values = [0.0, 1.0];
        let mut ctx = CandidateContext::new(&values, 1.0, 3, 1);

        let err = ctx.add_lazy([(VarId(0), 1.0), (VarId(5), 1.0)], 1.0).unwrap_err();
        assert!(matches!(err, MipError::InvalidProblem(_)));
        assert_eq!(ctx.num_pending(), 0);
    }

    #[test]
    fn test_closure_handler() {
        let values = [1.0];
        let mut calls = 0;
        let mut handler = |ctx: &mut CandidateContext<'_>| {
            calls += 1;
            ctx.add_lazy([(VarId(0), 1.0)], 0.0)
        };

        let mut ctx = CandidateContext::new(&values, 0.0, 0, 1);
        handler.on_candidate(&mut ctx).unwrap();
        assert_eq!(ctx.num_pending(), 1);
        assert_eq!(calls, 1);
    }
}
