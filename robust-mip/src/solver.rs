//! Branch-and-bound driver with lazy-constraint separation.

use crate::cuts::CutPool;
use crate::error::{MipError, MipResult};
use crate::lazy::{CandidateContext, LazyConstraintHandler};
use crate::master::{LinearCut, MasterBackend, MasterStatus, MicroLpBackend};
use crate::model::{MipProblem, MipSolution, MipStatus};
use crate::search::{BranchAndBound, SearchNode};
use crate::settings::MipSettings;

/// What happened to a node.
enum NodeOutcome {
    Branched,
    Pruned,
    Infeasible,
    Accepted,
    Unbounded,
    /// Time ran out between lazy rounds; carries the last LP objective.
    Interrupted(f64),
    /// The relaxation failed numerically; carries the best bound known for
    /// the node.
    Abandoned(f64),
}

/// MIP solver driving a master backend through branch-and-bound.
pub struct MipSolver<B: MasterBackend> {
    backend: B,
    settings: MipSettings,
    pool: CutPool,
}

impl<B: MasterBackend> MipSolver<B> {
    /// Create a solver over a master backend.
    pub fn new(backend: B, settings: MipSettings) -> Self {
        Self {
            backend,
            pool: CutPool::with_tolerance(settings.cut_parallel_tol),
            settings,
        }
    }

    /// Lazy cuts accumulated by the most recent solve, in insertion order.
    pub fn cut_pool(&self) -> &CutPool {
        &self.pool
    }

    /// The master backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Solve `prob`, invoking `handler` on every integer-feasible candidate.
    ///
    /// The cut pool starts empty and only grows during the run.
    pub fn solve<H>(&mut self, prob: &MipProblem, handler: &mut H) -> MipResult<MipSolution>
    where
        H: LazyConstraintHandler + ?Sized,
    {
        self.backend.initialize(prob)?;
        self.pool = CutPool::with_tolerance(self.settings.cut_parallel_tol);

        let mut tree = BranchAndBound::new(self.settings.clone(), prob.num_vars());
        tree.initialize(prob);

        let status = loop {
            if let Some(status) = tree.check_termination() {
                break status;
            }

            let Some(node) = tree.next_node() else {
                continue;
            };

            if node.can_prune(tree.incumbent.obj_val) {
                tree.node_pruned();
                continue;
            }

            match self.process_node(prob, &node, &mut tree, handler)? {
                NodeOutcome::Unbounded => break MipStatus::Unbounded,
                NodeOutcome::Interrupted(obj) => {
                    let mut node = node;
                    node.dual_bound = node.dual_bound.max(obj);
                    tree.enqueue(node);
                    break MipStatus::TimeLimit;
                }
                NodeOutcome::Abandoned(bound) => tree.abandon(node.id, bound),
                NodeOutcome::Branched
                | NodeOutcome::Pruned
                | NodeOutcome::Infeasible
                | NodeOutcome::Accepted => {}
            }

            tree.log_progress();
        };

        let solution = tree.finalize(status, prob);
        if self.settings.verbose {
            log::info!(
                "MIP finished: status={:?} obj={:.6e} nodes={} cuts={} time={}ms",
                solution.status,
                solution.obj_val,
                solution.nodes_explored,
                solution.cuts_added,
                solution.solve_time_ms,
            );
        }
        Ok(solution)
    }

    /// Solve one node, re-solving after each round of lazy cuts.
    fn process_node<H>(
        &mut self,
        prob: &MipProblem,
        node: &SearchNode,
        tree: &mut BranchAndBound,
        handler: &mut H,
    ) -> MipResult<NodeOutcome>
    where
        H: LazyConstraintHandler + ?Sized,
    {
        self.backend.reset_bounds();
        for bc in &node.bound_changes {
            self.backend.set_var_bounds(bc.var, bc.lb, bc.ub);
        }
        tree.node_explored();

        let mut rounds = 0usize;
        let mut bound = node.dual_bound;
        loop {
            let res = self.backend.solve()?;
            match res.status {
                MasterStatus::Optimal => bound = bound.max(res.obj_val),
                MasterStatus::NumericalFailure => return Ok(NodeOutcome::Abandoned(bound)),
                MasterStatus::Infeasible => {
                    log::debug!("node {}: relaxation infeasible", node.id);
                    return Ok(NodeOutcome::Infeasible);
                }
                MasterStatus::Unbounded if node.depth == 0 => return Ok(NodeOutcome::Unbounded),
                MasterStatus::Unbounded => {
                    return Err(MipError::MasterSolveError(format!(
                        "relaxation unbounded at node {} below a bounded root",
                        node.id
                    )));
                }
            }

            if rounds == 0 {
                tree.observe_child(node, res.obj_val);
            }

            if res.obj_val >= tree.incumbent.obj_val - 1e-9 {
                tree.node_pruned();
                return Ok(NodeOutcome::Pruned);
            }

            let backend = &self.backend;
            if let Some(decision) = tree.select_branching(&res.x, prob, |v| backend.var_bounds(v)) {
                for child in tree.branch(node, &decision, res.obj_val) {
                    if child.is_empty() {
                        tree.node_pruned();
                    } else {
                        tree.enqueue(child);
                    }
                }
                return Ok(NodeOutcome::Branched);
            }

            // Integer-feasible: suspend and hand the candidate to the handler
            let mut x = res.x;
            prob.round_integers(&mut x);
            self.pool.next_round();
            tree.lazy_called();

            let mut ctx = CandidateContext::new(
                &x,
                prob.to_user_objective(res.obj_val),
                node.id,
                self.pool.round(),
            );
            handler.on_candidate(&mut ctx)?;
            let cuts = ctx.take_cuts();

            if cuts.is_empty() {
                tree.update_incumbent(&x, prob.internal_objective(&x));
                return Ok(NodeOutcome::Accepted);
            }

            let added = self.install_cuts(cuts, &x);
            if added == 0 {
                return Err(MipError::CutGenerationError(format!(
                    "node {}: candidate rejected but no lazy cut separates it",
                    node.id
                )));
            }
            tree.cuts_added(added);
            log::debug!(
                "node {}: {} lazy cut(s) added, pool size {}",
                node.id,
                added,
                self.pool.len()
            );

            rounds += 1;
            if rounds >= self.settings.max_lazy_rounds {
                return Err(MipError::CutGenerationError(format!(
                    "node {}: lazy separation did not settle after {} rounds",
                    node.id, rounds
                )));
            }
            if tree.time_limit_exceeded() {
                return Ok(NodeOutcome::Interrupted(res.obj_val));
            }
        }
    }

    /// Append the cuts that separate `x` to the pool and the master.
    ///
    /// Returns how many were installed.
    fn install_cuts(&mut self, cuts: Vec<LinearCut>, x: &[f64]) -> usize {
        let mut added = 0;
        for cut in cuts {
            if cut.coefs.len() != x.len() || !cut.is_valid() {
                log::warn!("discarding malformed lazy cut");
                continue;
            }
            if !cut.is_violated(x, self.settings.lazy_violation_tol) {
                log::debug!(
                    "discarding lazy cut with violation {:.3e} at the candidate",
                    cut.violation(x)
                );
                continue;
            }
            if let Some(pooled) = self.pool.add(cut) {
                self.backend.add_cut(&pooled.cut);
                added += 1;
            }
        }
        added
    }
}

/// Solve `prob` with the default LP backend.
pub fn solve_mip<H>(
    prob: &MipProblem,
    settings: &MipSettings,
    handler: &mut H,
) -> MipResult<MipSolution>
where
    H: LazyConstraintHandler + ?Sized,
{
    MipSolver::new(MicroLpBackend::new(), settings.clone()).solve(prob, handler)
}
