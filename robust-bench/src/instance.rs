//! JSON instance files and run summaries.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use robust_portfolio::{PortfolioData, RobustReport, RunOutcome};
use serde::{Deserialize, Serialize};

/// Portfolio instance as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceFile {
    /// Mean returns
    pub mean: Vec<f64>,
    /// Per-asset deviations
    pub deviation: Vec<f64>,
    /// Uncertainty radius
    pub radius: f64,
    /// Cardinality budget (defaults to N / 4)
    #[serde(default)]
    pub cardinality: Option<usize>,
}

impl InstanceFile {
    /// Load from JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())
            .with_context(|| format!("Failed to open file {}", path.as_ref().display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse JSON from {}", path.as_ref().display()))
    }

    /// Validate and convert into solver input
    pub fn into_data(self) -> Result<PortfolioData> {
        let data = PortfolioData::new(self.mean, self.deviation, self.radius)
            .context("Invalid instance")?;
        Ok(match self.cardinality {
            Some(k) => data.with_cardinality(k),
            None => data,
        })
    }
}

/// Flat summary of a run for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Search status
    pub status: String,
    /// Outcome: optimal, limit_reached or infeasible
    pub outcome: String,
    /// Number of assets
    pub assets: usize,
    /// Cardinality budget
    pub cardinality: usize,
    /// Uncertainty radius
    pub radius: f64,
    /// Asset weights, if an allocation was found
    pub weights: Option<Vec<f64>>,
    /// Selected asset indices
    pub selected: Vec<usize>,
    /// Worst-case return of the allocation
    pub worst_case_return: Option<f64>,
    /// Nominal return of the allocation
    pub nominal_return: Option<f64>,
    /// Return claimed by the master
    pub guaranteed_return: Option<f64>,
    /// Robust cuts issued
    pub cuts: usize,
    /// Oracle invocations
    pub oracle_calls: u64,
    /// Nodes explored
    pub nodes_explored: u64,
    /// Degenerate candidates
    pub degenerate_norms: u64,
    /// Candidates accepted within tolerance
    pub sub_tolerance: u64,
    /// Wall time in milliseconds
    pub solve_time_ms: u64,
}

impl RunSummary {
    /// Summarize a report
    pub fn new(data: &PortfolioData, report: &RobustReport) -> Self {
        let outcome = match report.outcome {
            RunOutcome::Optimal(_) => "optimal",
            RunOutcome::LimitReached(_) => "limit_reached",
            RunOutcome::Infeasible => "infeasible",
        };
        let alloc = report.outcome.allocation();

        Self {
            status: format!("{:?}", report.status),
            outcome: outcome.to_string(),
            assets: data.num_assets(),
            cardinality: data.cardinality,
            radius: data.set.radius,
            weights: alloc.map(|a| a.weights.clone()),
            selected: alloc.map(|a| a.selected.clone()).unwrap_or_default(),
            worst_case_return: alloc.map(|a| a.worst_case_return),
            nominal_return: alloc.map(|a| a.nominal_return),
            guaranteed_return: alloc.map(|a| a.guaranteed_return),
            cuts: report.cuts.len(),
            oracle_calls: report.stats.oracle_calls,
            nodes_explored: report.stats.nodes_explored,
            degenerate_norms: report.stats.degenerate_norms,
            sub_tolerance: report.stats.sub_tolerance,
            solve_time_ms: report.stats.solve_time_ms,
        }
    }

    /// Save to JSON file
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create file {}", path.as_ref().display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .with_context(|| format!("Failed to write JSON to {}", path.as_ref().display()))?;
        Ok(())
    }
}
