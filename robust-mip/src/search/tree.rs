//! Bookkeeping for one branch-and-bound run: open nodes, incumbent,
//! counters and termination.

use std::time::Instant;

use super::{BranchDecision, BranchDirection, BranchRecord, BranchingSelector, NodeQueue, SearchNode};
use crate::model::{IncumbentTracker, MipProblem, MipSolution, MipStatus};
use crate::settings::MipSettings;

#[derive(Debug, Clone, Copy, Default)]
struct Counters {
    explored: u64,
    pruned: u64,
    cuts: u64,
    lazy_calls: u64,
    abandoned: u64,
}

/// State of a branch-and-bound run, in minimization form.
///
/// The relaxations themselves are solved by the caller; this type decides
/// what to solve next and when to stop.
pub struct BranchAndBound {
    settings: MipSettings,
    queue: NodeQueue,
    brancher: BranchingSelector,
    counters: Counters,
    next_id: u64,
    started: Instant,
    /// Smallest dual bound among abandoned nodes.
    abandoned_bound: f64,

    /// Best accepted candidate.
    pub incumbent: IncumbentTracker,
}

impl BranchAndBound {
    /// Empty run over `num_vars` columns.
    pub fn new(settings: MipSettings, num_vars: usize) -> Self {
        Self {
            queue: NodeQueue::new(settings.node_selection),
            brancher: BranchingSelector::new(settings.branching_rule, num_vars),
            counters: Counters::default(),
            next_id: 1,
            started: Instant::now(),
            abandoned_bound: f64::INFINITY,
            incumbent: IncumbentTracker::new(),
            settings,
        }
    }

    /// Start the clock and open the root.
    pub fn initialize(&mut self, prob: &MipProblem) {
        self.started = Instant::now();
        self.brancher.seed(&prob.obj);
        self.queue.push(SearchNode::root());
    }

    /// Next open node, if any.
    pub fn next_node(&mut self) -> Option<SearchNode> {
        self.queue.pop()
    }

    /// Put `node` (back) on the queue.
    pub fn enqueue(&mut self, node: SearchNode) {
        self.queue.push(node);
    }

    /// Count a solved relaxation.
    pub fn node_explored(&mut self) {
        self.counters.explored += 1;
    }

    /// Count a discarded node.
    pub fn node_pruned(&mut self) {
        self.counters.pruned += 1;
    }

    /// Give up on a subtree whose relaxation could not be solved.
    ///
    /// `dual_bound` stays part of the global bound, so the run can no longer
    /// claim optimality unless an incumbent reaches it.
    pub fn abandon(&mut self, node_id: u64, dual_bound: f64) {
        self.counters.abandoned += 1;
        self.abandoned_bound = self.abandoned_bound.min(dual_bound);
        log::warn!(
            "node {}: relaxation failed numerically, subtree abandoned (bound {:.6e})",
            node_id,
            dual_bound
        );
    }

    /// Count installed lazy cuts.
    pub fn cuts_added(&mut self, count: usize) {
        self.counters.cuts += count as u64;
    }

    /// Count a handler invocation.
    pub fn lazy_called(&mut self) {
        self.counters.lazy_calls += 1;
    }

    /// Branching decision for the relaxation point `x`, or `None` when `x`
    /// is integral.
    pub fn select_branching(
        &self,
        x: &[f64],
        prob: &MipProblem,
        bounds: impl Fn(usize) -> (f64, f64),
    ) -> Option<BranchDecision> {
        self.brancher.select(x, prob, bounds, self.settings.int_feas_tol)
    }

    /// Split `parent` along `decision`; both children inherit `parent_obj`
    /// as their dual bound. Returns `[down, up]`.
    pub fn branch(
        &mut self,
        parent: &SearchNode,
        decision: &BranchDecision,
        parent_obj: f64,
    ) -> [SearchNode; 2] {
        let f = decision.value - decision.value.floor();
        let record = |direction, distance| BranchRecord {
            var: decision.var,
            direction,
            distance,
            parent_obj,
        };

        let id = self.next_id;
        self.next_id += 2;
        [
            parent.child(id, decision.down, record(BranchDirection::Down, f), parent_obj),
            parent.child(id + 1, decision.up, record(BranchDirection::Up, 1.0 - f), parent_obj),
        ]
    }

    /// Feed a child's first relaxation objective back into the pseudocosts.
    pub fn observe_child(&mut self, node: &SearchNode, obj: f64) {
        if let Some(b) = node.branch {
            self.brancher
                .observe(b.var, b.direction, b.distance, obj - b.parent_obj);
        }
    }

    /// Offer an accepted candidate; on improvement, open nodes it dominates
    /// are dropped.
    pub fn update_incumbent(&mut self, x: &[f64], obj: f64) -> bool {
        if !self.incumbent.update(x, obj) {
            return false;
        }
        let dropped = self.queue.prune_by_bound(obj);
        self.counters.pruned += dropped as u64;
        if self.settings.verbose {
            log::info!("New incumbent {:.6e}, {} open nodes dropped", obj, dropped);
        }
        true
    }

    /// Lowest dual bound over open and abandoned nodes.
    fn unexplored_bound(&self) -> f64 {
        self.queue.best_bound().min(self.abandoned_bound)
    }

    /// Global lower bound: the best open or abandoned node, capped by the
    /// incumbent.
    pub fn best_bound(&self) -> f64 {
        self.unexplored_bound().min(self.incumbent.obj_val)
    }

    /// Relative gap between incumbent and bound.
    pub fn gap(&self) -> f64 {
        self.incumbent.gap(self.best_bound())
    }

    /// Milliseconds since `initialize`.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// The wall-clock budget is spent.
    pub fn time_limit_exceeded(&self) -> bool {
        matches!(self.settings.time_limit_ms, Some(limit) if self.elapsed_ms() >= limit)
    }

    /// Status to stop with, or `None` to keep searching.
    ///
    /// An exhausted queue wins over every budget.
    pub fn check_termination(&self) -> Option<MipStatus> {
        if self.queue.is_empty() {
            return Some(if self.abandoned_bound < self.incumbent.obj_val - 1e-9 {
                MipStatus::NumericalFailure
            } else if self.incumbent.has_incumbent() {
                MipStatus::Optimal
            } else {
                MipStatus::Infeasible
            });
        }
        if self.incumbent.has_incumbent() {
            let abs_gap = self.incumbent.obj_val - self.unexplored_bound();
            if abs_gap <= self.settings.gap_abs_tol || self.gap() <= self.settings.gap_tol {
                return Some(MipStatus::GapLimit);
            }
        }
        if self.time_limit_exceeded() {
            Some(MipStatus::TimeLimit)
        } else if self.counters.explored >= self.settings.max_nodes {
            Some(MipStatus::NodeLimit)
        } else {
            None
        }
    }

    /// Result in the caller's objective sense.
    pub fn finalize(&self, status: MipStatus, prob: &MipProblem) -> MipSolution {
        let bound = match status {
            MipStatus::Infeasible => f64::INFINITY,
            _ => self.best_bound(),
        };
        MipSolution {
            status,
            x: self.incumbent.solution.clone().unwrap_or_default(),
            obj_val: prob.to_user_objective(self.incumbent.obj_val),
            bound: prob.to_user_objective(bound),
            gap: self.incumbent.gap(bound),
            nodes_explored: self.counters.explored,
            nodes_pruned: self.counters.pruned,
            nodes_abandoned: self.counters.abandoned,
            cuts_added: self.counters.cuts,
            lazy_calls: self.counters.lazy_calls,
            solve_time_ms: self.elapsed_ms(),
            incumbent_updates: self.incumbent.update_count,
        }
    }

    /// One `info!` line every `log_freq` explored nodes when verbose.
    pub fn log_progress(&self) {
        let c = &self.counters;
        if !self.settings.verbose || c.explored % self.settings.log_freq.max(1) != 0 {
            return;
        }
        log::info!(
            "{:>7} nodes {:>6} open | bound {:.6e} | incumbent {:.6e} | gap {:.2}% | {} cuts | {:.1}s",
            c.explored,
            self.queue.len(),
            self.best_bound(),
            self.incumbent.obj_val,
            self.gap() * 100.0,
            c.cuts,
            self.elapsed_ms() as f64 / 1000.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObjectiveSense, ProblemBuilder};

    fn binaries(n: usize, sense: ObjectiveSense) -> MipProblem {
        let mut b = ProblemBuilder::new(sense);
        for _ in 0..n {
            b.add_binary(1.0);
        }
        b.build().unwrap()
    }

    fn started(prob: &MipProblem, settings: MipSettings) -> BranchAndBound {
        let mut tree = BranchAndBound::new(settings, prob.num_vars());
        tree.initialize(prob);
        tree
    }

    #[test]
    fn test_root_is_the_only_open_node() {
        let prob = binaries(4, ObjectiveSense::Minimize);
        let mut tree = started(&prob, MipSettings::default());

        let root = tree.next_node().unwrap();
        assert_eq!(root.id, 0);
        assert!(tree.next_node().is_none());
    }

    #[test]
    fn test_children_get_fresh_ids_and_parent_bound() {
        let prob = binaries(4, ObjectiveSense::Minimize);
        let mut tree = started(&prob, MipSettings::default());
        let root = tree.next_node().unwrap();

        let d = tree
            .select_branching(&[0.0, 0.5, 1.0, 0.0], &prob, |_| (0.0, 1.0))
            .unwrap();
        let [down, up] = tree.branch(&root, &d, 3.0);
        assert_eq!((down.id, up.id), (1, 2));
        assert_eq!(down.dual_bound, 3.0);
        assert_eq!(up.bound_changes, vec![d.up]);
    }

    #[test]
    fn test_incumbent_drops_dominated_nodes() {
        let prob = binaries(4, ObjectiveSense::Minimize);
        let mut tree = started(&prob, MipSettings::default());
        let root = tree.next_node().unwrap();
        let d = tree
            .select_branching(&[0.5; 4], &prob, |_| (0.0, 1.0))
            .unwrap();
        for child in tree.branch(&root, &d, 2.0) {
            tree.enqueue(child);
        }

        assert!(tree.update_incumbent(&[1.0; 4], 4.0));
        assert!(!tree.update_incumbent(&[1.0; 4], 5.0));
        assert!(tree.update_incumbent(&[0.0; 4], 2.0));

        // Both children had bound 2 and are gone
        assert_eq!(tree.check_termination(), Some(MipStatus::Optimal));
        assert_eq!(tree.finalize(MipStatus::Optimal, &prob).nodes_pruned, 2);
    }

    #[test]
    fn test_empty_queue_without_incumbent_is_infeasible() {
        let prob = binaries(2, ObjectiveSense::Minimize);
        let mut tree = started(&prob, MipSettings::default());
        tree.next_node();
        assert_eq!(tree.check_termination(), Some(MipStatus::Infeasible));
    }

    #[test]
    fn test_node_budget() {
        let prob = binaries(2, ObjectiveSense::Minimize);
        let mut tree = started(&prob, MipSettings::default().with_max_nodes(1));
        let root = tree.next_node().unwrap();
        tree.node_explored();
        let d = tree
            .select_branching(&[0.5, 0.5], &prob, |_| (0.0, 1.0))
            .unwrap();
        for child in tree.branch(&root, &d, 0.0) {
            tree.enqueue(child);
        }
        assert_eq!(tree.check_termination(), Some(MipStatus::NodeLimit));
    }

    #[test]
    fn test_abandoned_subtree_blocks_optimality() {
        let prob = binaries(2, ObjectiveSense::Minimize);
        let mut tree = started(&prob, MipSettings::default());
        let root = tree.next_node().unwrap();
        let d = tree
            .select_branching(&[0.5, 0.0], &prob, |_| (0.0, 1.0))
            .unwrap();
        let [down, up] = tree.branch(&root, &d, 1.0);

        tree.abandon(down.id, down.dual_bound);
        tree.enqueue(up);
        tree.next_node();
        tree.update_incumbent(&[1.0, 1.0], 2.0);

        // The abandoned bound 1 is below the incumbent 2
        assert_eq!(tree.check_termination(), Some(MipStatus::NumericalFailure));
        let sol = tree.finalize(MipStatus::NumericalFailure, &prob);
        assert_eq!(sol.bound, 1.0);
        assert_eq!(sol.nodes_abandoned, 1);
        assert_eq!(sol.x, vec![1.0, 1.0]);
    }

    #[test]
    fn test_abandoned_subtree_dominated_by_incumbent() {
        let prob = binaries(1, ObjectiveSense::Minimize);
        let mut tree = started(&prob, MipSettings::default());
        tree.next_node();
        tree.abandon(7, 3.0);
        tree.update_incumbent(&[0.0], 3.0);
        assert_eq!(tree.check_termination(), Some(MipStatus::Optimal));
    }

    #[test]
    fn test_abandoned_root_is_not_infeasible() {
        let prob = binaries(1, ObjectiveSense::Minimize);
        let mut tree = started(&prob, MipSettings::default());
        let root = tree.next_node().unwrap();
        tree.abandon(root.id, root.dual_bound);
        assert_eq!(tree.check_termination(), Some(MipStatus::NumericalFailure));
    }

    #[test]
    fn test_finalize_reports_maximize_sense() {
        let prob = binaries(1, ObjectiveSense::Maximize);
        let mut tree = started(&prob, MipSettings::default());
        tree.next_node();
        tree.update_incumbent(&[1.0], -1.0);

        let sol = tree.finalize(MipStatus::Optimal, &prob);
        assert_eq!(sol.obj_val, 1.0);
        assert_eq!(sol.bound, 1.0);
        assert_eq!(sol.x, vec![1.0]);
    }
}
