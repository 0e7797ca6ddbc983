//! Search settings.

/// How the variable to branch on is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchingRule {
    /// Fractional part nearest one half.
    #[default]
    MostFractional,

    /// Average bound change per unit of rounding, learned from earlier
    /// branches.
    ///
    /// Variables without history start from their objective coefficient.
    Pseudocost,
}

/// Order in which open nodes are solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeSelection {
    /// Lowest dual bound first.
    #[default]
    BestBound,

    /// Deepest node first.
    DepthFirst,

    /// Best bound, but every `dive_freq`-th node enqueued is ranked by depth.
    Hybrid {
        /// Dive period.
        dive_freq: usize,
    },
}

/// Limits, tolerances and strategy for [`MipSolver`](crate::MipSolver).
#[derive(Debug, Clone)]
pub struct MipSettings {
    /// Stop after this many relaxation solves.
    pub max_nodes: u64,

    /// Wall-clock budget; `None` runs until the tree closes.
    pub time_limit_ms: Option<u64>,

    /// Stop once `|incumbent - bound| / |incumbent|` drops to this.
    pub gap_tol: f64,

    /// Stop once `|incumbent - bound|` drops to this.
    pub gap_abs_tol: f64,

    /// Largest distance to the nearest integer still treated as integral.
    pub int_feas_tol: f64,

    /// Branching variable choice.
    pub branching_rule: BranchingRule,

    /// Open node order.
    pub node_selection: NodeSelection,

    /// A lazy cut is installed only if the candidate violates it by more.
    pub lazy_violation_tol: f64,

    /// Two lazy cuts whose unit-normalised rows agree entry-wise to this are
    /// the same cut; the second is not installed.
    pub cut_parallel_tol: f64,

    /// Re-solves allowed at one node before the search gives up.
    pub max_lazy_rounds: usize,

    /// Emit `info!` progress lines.
    pub verbose: bool,

    /// Nodes between progress lines.
    pub log_freq: u64,
}

impl Default for MipSettings {
    fn default() -> Self {
        Self {
            max_nodes: 1_000_000,
            time_limit_ms: None,
            gap_tol: 1e-4,
            gap_abs_tol: 1e-6,
            int_feas_tol: 1e-6,
            branching_rule: BranchingRule::MostFractional,
            node_selection: NodeSelection::BestBound,
            lazy_violation_tol: 1e-9,
            cut_parallel_tol: 1e-7,
            max_lazy_rounds: 10_000,
            verbose: false,
            log_freq: 100,
        }
    }
}

impl MipSettings {
    /// Defaults with a progress line for every node.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            log_freq: 1,
            ..Self::default()
        }
    }

    /// Wall-clock budget in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit_ms = Some((seconds.max(0.0) * 1000.0) as u64);
        self
    }

    /// Node budget.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = nodes;
        self
    }

    /// Relative gap at which the search stops.
    pub fn with_gap_tol(mut self, tol: f64) -> Self {
        self.gap_tol = tol;
        self
    }

    /// Re-solve budget per node.
    pub fn with_max_lazy_rounds(mut self, rounds: usize) -> Self {
        self.max_lazy_rounds = rounds;
        self
    }

    /// Tolerance below which two lazy cuts count as duplicates.
    pub fn with_cut_parallel_tol(mut self, tol: f64) -> Self {
        self.cut_parallel_tol = tol.max(0.0);
        self
    }

    /// Open node order.
    pub fn with_node_selection(mut self, selection: NodeSelection) -> Self {
        self.node_selection = selection;
        self
    }

    /// Branching variable choice.
    pub fn with_branching_rule(mut self, rule: BranchingRule) -> Self {
        self.branching_rule = rule;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let s = MipSettings::default()
            .with_time_limit(1.5)
            .with_max_nodes(42)
            .with_max_lazy_rounds(3)
            .with_cut_parallel_tol(1e-4)
            .with_branching_rule(BranchingRule::Pseudocost)
            .with_node_selection(NodeSelection::DepthFirst);

        assert_eq!(s.time_limit_ms, Some(1500));
        assert_eq!(s.max_nodes, 42);
        assert_eq!(s.max_lazy_rounds, 3);
        assert_eq!(s.cut_parallel_tol, 1e-4);
        assert_eq!(s.branching_rule, BranchingRule::Pseudocost);
        assert_eq!(s.node_selection, NodeSelection::DepthFirst);
    }

    #[test]
    fn test_negative_time_limit_clamps_to_zero() {
        assert_eq!(MipSettings::default().with_time_limit(-2.0).time_limit_ms, Some(0));
    }

    #[test]
    fn test_verbose_logs_every_node() {
        let s = MipSettings::verbose().with_gap_tol(1e-3);
        assert!(s.verbose);
        assert_eq!(s.log_freq, 1);
        assert_eq!(s.gap_tol, 1e-3);
    }
}
