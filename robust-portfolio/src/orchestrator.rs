//! Master loop: robust portfolio selection by lazy robust cuts.
//!
//! The master problem is
//!
//! ```text
//! maximize   z
//! subject to sum(x) = 1
//!            x_i <= y_i              (i = 1..N)
//!            sum(y) <= K
//!            z <= p̄ · x              (nominal seed)
//!            z <= worst_p · x        (lazy, one per accepted cut)
//!            x in [0, 1]^N, y in {0, 1}^N, z <= max(p̄)
//! ```
//!
//! Every integer-feasible candidate found by the search is passed to the
//! separation oracle. A violated worst case adds a robust cut and the node
//! is re-solved; otherwise the candidate is accepted.

use robust_mip::{
    CandidateContext, ConstraintSense, LazyConstraintHandler, MicroLpBackend, MipError, MipProblem,
    MipResult, MipSettings, MipSolution, MipSolver, MipStatus, ObjectiveSense, ProblemBuilder,
    VarId,
};

use crate::error::{OracleError, PortfolioError, PortfolioResult};
use crate::oracle::{
    ClosedFormMinimizer, RobustCut, Separation, SeparationOracle, UncertaintyMinimizer,
};
use crate::policy::{CutAcceptancePolicy, DEFAULT_EPSILON};
use crate::uncertainty::PortfolioData;

/// Configuration of a robust run.
#[derive(Debug, Clone)]
pub struct RobustConfig {
    /// Cut acceptance tolerance ε.
    pub epsilon: f64,

    /// Settings for the master search.
    pub mip: MipSettings,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_EPSILON,
            mip: MipSettings::default(),
        }
    }
}

impl RobustConfig {
    /// Set the cut acceptance tolerance.
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Replace the master search settings.
    pub fn with_mip_settings(mut self, mip: MipSettings) -> Self {
        self.mip = mip;
        self
    }

    /// Set a wall-clock limit in seconds.
    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.mip = self.mip.with_time_limit(seconds);
        self
    }

    /// Set a node budget.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.mip = self.mip.with_max_nodes(nodes);
        self
    }

    /// Enable progress logging.
    pub fn verbose(mut self) -> Self {
        self.mip.verbose = true;
        self
    }
}

/// Handles to the master problem's variables.
#[derive(Debug, Clone)]
pub struct MasterVars {
    /// Allocation weights.
    pub x: Vec<VarId>,

    /// Selection indicators.
    pub y: Vec<VarId>,

    /// Epigraph variable for the worst-case return.
    pub z: VarId,
}

/// A selected portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Weight per asset.
    pub weights: Vec<f64>,

    /// Indices of assets whose indicator is set.
    pub selected: Vec<usize>,

    /// Worst-case return over the uncertainty set.
    pub worst_case_return: f64,

    /// Return under the mean.
    pub nominal_return: f64,

    /// Return claimed by the master (the value of z).
    pub guaranteed_return: f64,
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The search proved optimality (within its gap tolerance).
    Optimal(Allocation),

    /// A time or node budget ran out, or subtrees were dropped after the
    /// master failed numerically; carries the incumbent if any.
    LimitReached(Option<Allocation>),

    /// No allocation satisfies the budget, cardinality and cuts.
    Infeasible,
}

impl RunOutcome {
    /// The allocation, if one was found.
    pub fn allocation(&self) -> Option<&Allocation> {
        match self {
            RunOutcome::Optimal(a) => Some(a),
            RunOutcome::LimitReached(a) => a.as_ref(),
            RunOutcome::Infeasible => None,
        }
    }

    /// True for [`RunOutcome::Optimal`].
    pub fn is_optimal(&self) -> bool {
        matches!(self, RunOutcome::Optimal(_))
    }
}

/// One candidate shown to the oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    /// Search node of the candidate.
    pub node_id: u64,

    /// Allocation part of the candidate.
    pub weights: Vec<f64>,

    /// The master's z at the candidate.
    pub claimed_return: f64,

    /// Worst-case return computed by the oracle.
    pub worst_case_return: f64,

    /// Whether a robust cut was issued.
    pub cut_added: bool,
}

/// Counters for a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Oracle invocations.
    pub oracle_calls: u64,
    /// Robust cuts installed in the master.
    pub cuts_added: u64,
    /// Candidates whose weighted deviation norm vanished.
    pub degenerate_norms: u64,
    /// Candidates accepted despite a violation no larger than ε.
    pub sub_tolerance: u64,
    /// Nodes explored by the search.
    pub nodes_explored: u64,
    /// Wall time of the search.
    pub solve_time_ms: u64,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct RobustReport {
    /// Final result.
    pub outcome: RunOutcome,

    /// Status reported by the search.
    pub status: MipStatus,

    /// Robust cuts in the order they were issued.
    pub cuts: Vec<RobustCut>,

    /// Candidates in the order they were separated.
    pub trace: Vec<CandidateRecord>,

    /// Counters.
    pub stats: RunStats,
}

/// Lazy-constraint handler that separates candidates with the oracle.
struct RobustCutHandler<'a, M> {
    oracle: &'a SeparationOracle<M>,
    vars: &'a MasterVars,
    cuts: Vec<RobustCut>,
    trace: Vec<CandidateRecord>,
    stats: RunStats,
    failure: Option<OracleError>,
}

impl<'a, M: UncertaintyMinimizer> RobustCutHandler<'a, M> {
    fn new(oracle: &'a SeparationOracle<M>, vars: &'a MasterVars) -> Self {
        Self {
            oracle,
            vars,
            cuts: Vec::new(),
            trace: Vec::new(),
            stats: RunStats::default(),
            failure: None,
        }
    }
}

impl<M: UncertaintyMinimizer> LazyConstraintHandler for RobustCutHandler<'_, M> {
    fn on_candidate(&mut self, ctx: &mut CandidateContext<'_>) -> MipResult<()> {
        let x = ctx.values_of(&self.vars.x);
        let z = ctx.value(self.vars.z);
        let node_id = ctx.node_id();
        self.stats.oracle_calls += 1;

        let separation = match self.oracle.separate(&x, z) {
            Ok(s) => s,
            Err(e) => {
                let msg = e.to_string();
                self.failure = Some(e);
                return Err(MipError::CallbackError(msg));
            }
        };

        let (worst_z, cut_added) = match separation {
            Separation::NoViolation { worst_z, degenerate } => {
                if degenerate {
                    self.stats.degenerate_norms += 1;
                } else if worst_z < z {
                    self.stats.sub_tolerance += 1;
                }
                (worst_z, false)
            }
            Separation::Cut(cut) => {
                log::debug!(
                    "node {}: claimed {:.6} but worst case {:.6}, adding cut",
                    node_id,
                    z,
                    cut.worst_z
                );
                let n_vars = ctx.values().len();
                ctx.add_lazy_cut(cut.to_linear_cut(&self.vars.x, self.vars.z, n_vars, node_id));
                let worst_z = cut.worst_z;
                self.cuts.push(cut);
                (worst_z, true)
            }
        };

        self.trace.push(CandidateRecord {
            node_id,
            weights: x,
            claimed_return: z,
            worst_case_return: worst_z,
            cut_added,
        });
        Ok(())
    }
}

/// Robust portfolio solver.
#[derive(Debug, Clone)]
pub struct RobustPortfolioSolver<M = ClosedFormMinimizer> {
    data: PortfolioData,
    config: RobustConfig,
    oracle: SeparationOracle<M>,
}

impl RobustPortfolioSolver<ClosedFormMinimizer> {
    /// Create a solver using the closed-form oracle.
    pub fn new(data: PortfolioData, config: RobustConfig) -> PortfolioResult<Self> {
        Self::with_minimizer(data, config, ClosedFormMinimizer)
    }
}

impl<M: UncertaintyMinimizer> RobustPortfolioSolver<M> {
    /// Create a solver with a custom worst-case minimiser.
    pub fn with_minimizer(
        data: PortfolioData,
        config: RobustConfig,
        minimizer: M,
    ) -> PortfolioResult<Self> {
        data.set.validate()?;
        let policy = CutAcceptancePolicy::new(config.epsilon)?;
        let oracle = SeparationOracle::with_minimizer(data.set.clone(), policy, minimizer);
        Ok(Self {
            data,
            config,
            oracle,
        })
    }

    /// Instance data.
    pub fn data(&self) -> &PortfolioData {
        &self.data
    }

    /// Run configuration.
    pub fn config(&self) -> &RobustConfig {
        &self.config
    }

    /// The separation oracle.
    pub fn oracle(&self) -> &SeparationOracle<M> {
        &self.oracle
    }

    /// Build the master problem without any robust cuts.
    pub fn build_master(&self) -> PortfolioResult<(MipProblem, MasterVars)> {
        let n = self.data.num_assets();
        let mean = &self.data.set.mean;
        let mut b = ProblemBuilder::new(ObjectiveSense::Maximize);

        let x: Vec<VarId> = (0..n).map(|_| b.add_continuous(0.0, 1.0, 0.0)).collect();
        let y: Vec<VarId> = (0..n).map(|_| b.add_binary(0.0)).collect();
        let z = b.add_continuous(f64::NEG_INFINITY, self.data.max_mean(), 1.0);

        b.add_constraint(x.iter().map(|&v| (v, 1.0)), ConstraintSense::Eq, 1.0);
        for (&xi, &yi) in x.iter().zip(&y) {
            b.add_constraint([(xi, 1.0), (yi, -1.0)], ConstraintSense::Le, 0.0);
        }
        b.add_constraint(
            y.iter().map(|&v| (v, 1.0)),
            ConstraintSense::Le,
            self.data.cardinality as f64,
        );
        b.add_constraint(
            std::iter::once((z, 1.0)).chain(x.iter().zip(mean).map(|(&v, &p)| (v, -p))),
            ConstraintSense::Le,
            0.0,
        );

        let prob = b.build()?;
        Ok((prob, MasterVars { x, y, z }))
    }

    /// Run the search to completion or to a budget.
    pub fn run(&self) -> PortfolioResult<RobustReport> {
        let (prob, vars) = self.build_master()?;

        if self.config.mip.verbose {
            log::info!(
                "Robust portfolio: {} assets, cardinality {}, radius {}, epsilon {}",
                self.data.num_assets(),
                self.data.cardinality,
                self.data.set.radius,
                self.config.epsilon
            );
        }

        let mut handler = RobustCutHandler::new(&self.oracle, &vars);
        let mut solver = MipSolver::new(MicroLpBackend::new(), self.config.mip.clone());
        let sol = match solver.solve(&prob, &mut handler) {
            Ok(sol) => sol,
            Err(e) => {
                return Err(match handler.failure.take() {
                    Some(oracle_err) => PortfolioError::Oracle(oracle_err),
                    None => e.into(),
                })
            }
        };

        let outcome = match sol.status {
            MipStatus::Optimal | MipStatus::GapLimit => {
                RunOutcome::Optimal(self.allocation(&sol, &vars)?)
            }
            MipStatus::NodeLimit | MipStatus::TimeLimit | MipStatus::NumericalFailure => {
                if sol.nodes_abandoned > 0 {
                    log::warn!(
                        "{} subtree(s) dropped after numerical failures; optimality not proven",
                        sol.nodes_abandoned
                    );
                }
                let incumbent = if sol.has_solution() {
                    Some(self.allocation(&sol, &vars)?)
                } else {
                    None
                };
                RunOutcome::LimitReached(incumbent)
            }
            MipStatus::Infeasible => RunOutcome::Infeasible,
            MipStatus::Unbounded => {
                return Err(MipError::InternalError(
                    "master reported unbounded despite a bounded epigraph variable".to_string(),
                )
                .into())
            }
        };

        let mut stats = handler.stats;
        stats.cuts_added = sol.cuts_added;
        stats.nodes_explored = sol.nodes_explored;
        stats.solve_time_ms = sol.solve_time_ms;

        if self.config.mip.verbose {
            match outcome.allocation() {
                Some(a) => log::info!(
                    "Robust portfolio finished: {:?}, worst case {:.6}, nominal {:.6}, {} cuts",
                    sol.status,
                    a.worst_case_return,
                    a.nominal_return,
                    stats.cuts_added
                ),
                None => log::info!("Robust portfolio finished: {:?}, no allocation", sol.status),
            }
        }

        Ok(RobustReport {
            outcome,
            status: sol.status,
            cuts: handler.cuts,
            trace: handler.trace,
            stats,
        })
    }

    fn allocation(&self, sol: &MipSolution, vars: &MasterVars) -> PortfolioResult<Allocation> {
        if !sol.has_solution() {
            return Err(MipError::InternalError(format!(
                "status {:?} without an incumbent",
                sol.status
            ))
            .into());
        }

        let weights: Vec<f64> = vars
            .x
            .iter()
            .map(|v| sol.x[v.index()].clamp(0.0, 1.0))
            .collect();
        let selected = vars
            .y
            .iter()
            .enumerate()
            .filter(|(_, v)| sol.x[v.index()] > 0.5)
            .map(|(i, _)| i)
            .collect();

        Ok(Allocation {
            worst_case_return: self.oracle.worst_case_return(&weights)?,
            nominal_return: self.data.set.nominal_return(&weights),
            guaranteed_return: sol.x[vars.z.index()],
            selected,
            weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_shape() {
        let data = PortfolioData::generated(8, 1.0).unwrap();
        let solver = RobustPortfolioSolver::new(data, RobustConfig::default()).unwrap();
        let (prob, vars) = solver.build_master().unwrap();

        assert_eq!(prob.num_vars(), 17);
        // budget + 8 links + cardinality + nominal seed
        assert_eq!(prob.num_constraints(), 11);
        assert_eq!(prob.num_integers(), 8);
        assert_eq!(vars.z.index(), 16);
        assert!((prob.var_ub[vars.z.index()] - 1.2).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_epsilon() {
        let data = PortfolioData::generated(4, 1.0).unwrap();
        let config = RobustConfig::default().with_epsilon(0.0);
        assert!(matches!(
            RobustPortfolioSolver::new(data, config),
            Err(PortfolioError::InvalidData(_))
        ));
    }

    #[test]
    fn test_single_asset_budget_picks_best_worst_case() {
        let data = PortfolioData::generated(4, 1.0).unwrap();
        assert_eq!(data.cardinality, 1);

        let best = data
            .set
            .mean
            .iter()
            .zip(&data.set.deviation)
            .map(|(p, s)| p - s)
            .fold(f64::NEG_INFINITY, f64::max);

        let solver = RobustPortfolioSolver::new(data, RobustConfig::default()).unwrap();
        let report = solver.run().unwrap();

        let alloc = report.outcome.allocation().unwrap();
        assert!(report.outcome.is_optimal());
        assert_eq!(alloc.selected.len(), 1);
        assert!(alloc.guaranteed_return >= best - 1e-3);
        assert!(alloc.worst_case_return >= best - 1e-2 - 1e-3);
        assert!(!report.cuts.is_empty());
        assert_eq!(report.stats.oracle_calls, report.trace.len() as u64);
    }

    #[test]
    fn test_infeasible_when_budget_is_zero() {
        let data = PortfolioData::generated(2, 1.0).unwrap();
        assert_eq!(data.cardinality, 0);

        let solver = RobustPortfolioSolver::new(data, RobustConfig::default()).unwrap();
        let report = solver.run().unwrap();
        assert_eq!(report.outcome, RunOutcome::Infeasible);
        assert!(report.cuts.is_empty());
    }

    #[test]
    fn test_riskless_assets_need_no_cuts() {
        let mean = vec![1.10, 1.30, 1.20, 1.05, 1.25, 1.15, 1.00, 1.12];
        let data = PortfolioData::new(mean, vec![0.0; 8], 1.0).unwrap();
        assert_eq!(data.cardinality, 2);

        let solver = RobustPortfolioSolver::new(data, RobustConfig::default()).unwrap();
        let report = solver.run().unwrap();

        assert!(report.outcome.is_optimal());
        assert!(report.stats.degenerate_norms > 0);
        assert!(report.cuts.is_empty());
        let alloc = report.outcome.allocation().unwrap();
        assert!((alloc.guaranteed_return - 1.30).abs() < 1e-3);
        assert!((alloc.worst_case_return - alloc.nominal_return).abs() < 1e-9);
    }
}
