//! Command-line driver for robust portfolio selection.

mod instance;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use robust_portfolio::{
    ClosedFormMinimizer, PortfolioData, ProjectedGradientMinimizer, RobustConfig,
    RobustPortfolioSolver, RobustReport, RunOutcome, UncertaintyMinimizer, DEFAULT_EPSILON,
};

use instance::{InstanceFile, RunSummary};

/// Worst-case minimiser used by the separation oracle
#[derive(ValueEnum, Clone, Copy, Debug)]
enum OracleChoice {
    ClosedForm,
    ProjectedGradient,
}

#[derive(Parser, Debug)]
#[command(name = "robust-bench", about = "Robust portfolio selection with lazy worst-case cuts")]
struct Args {
    /// Number of assets in the generated instance
    #[arg(long, default_value_t = 20)]
    assets: usize,

    /// Uncertainty radius Γ
    #[arg(long, default_value_t = 1.5)]
    radius: f64,

    /// Cardinality budget (defaults to assets / 4)
    #[arg(long)]
    cardinality: Option<usize>,

    /// Cut acceptance tolerance ε
    #[arg(long, default_value_t = DEFAULT_EPSILON)]
    epsilon: f64,

    /// Time limit in seconds
    #[arg(long)]
    time_limit: Option<f64>,

    /// Node budget
    #[arg(long)]
    max_nodes: Option<u64>,

    /// Worst-case minimiser
    #[arg(long, value_enum, default_value_t = OracleChoice::ClosedForm)]
    oracle: OracleChoice,

    /// Load the instance from a JSON file instead of generating it
    #[arg(long)]
    instance: Option<PathBuf>,

    /// Write a JSON summary to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log search progress
    #[arg(short, long)]
    verbose: bool,
}

fn load_data(args: &Args) -> Result<PortfolioData> {
    let data = match &args.instance {
        Some(path) => InstanceFile::load_json(path)?.into_data()?,
        None => PortfolioData::generated(args.assets, args.radius)
            .context("Failed to generate instance")?,
    };
    Ok(match args.cardinality {
        Some(k) => data.with_cardinality(k),
        None => data,
    })
}

fn build_config(args: &Args) -> RobustConfig {
    let mut config = RobustConfig::default().with_epsilon(args.epsilon);
    if let Some(secs) = args.time_limit {
        config = config.with_time_limit(secs);
    }
    if let Some(nodes) = args.max_nodes {
        config = config.with_max_nodes(nodes);
    }
    if args.verbose {
        config = config.verbose();
    }
    config
}

fn run_with<M: UncertaintyMinimizer>(
    data: PortfolioData,
    config: RobustConfig,
    minimizer: M,
) -> Result<RobustReport> {
    let solver = RobustPortfolioSolver::with_minimizer(data, config, minimizer)
        .context("Failed to set up solver")?;
    solver.run().context("Robust run failed")
}

fn print_report(data: &PortfolioData, report: &RobustReport) {
    println!("\n{}", "=".repeat(60));
    println!(
        "Assets: {}  Cardinality: {}  Radius: {}",
        data.num_assets(),
        data.cardinality,
        data.set.radius
    );
    println!("Status: {:?}", report.status);

    match &report.outcome {
        RunOutcome::Infeasible => println!("Outcome: infeasible"),
        RunOutcome::LimitReached(None) => println!("Outcome: limit reached, no allocation"),
        outcome => {
            let label = if outcome.is_optimal() {
                "optimal"
            } else {
                "limit reached"
            };
            println!("Outcome: {}", label);
            if let Some(a) = outcome.allocation() {
                println!("  Worst-case return:  {:.6}", a.worst_case_return);
                println!("  Nominal return:     {:.6}", a.nominal_return);
                println!("  Guaranteed (z):     {:.6}", a.guaranteed_return);
                for &i in &a.selected {
                    println!("  asset {:>4}: {:.4}", i, a.weights[i]);
                }
            }
        }
    }

    println!(
        "Cuts: {}  Oracle calls: {}  Nodes: {}  Time: {:.1}ms",
        report.cuts.len(),
        report.stats.oracle_calls,
        report.stats.nodes_explored,
        report.stats.solve_time_ms as f64
    );
    if report.stats.degenerate_norms > 0 || report.stats.sub_tolerance > 0 {
        println!(
            "Degenerate candidates: {}  Accepted within tolerance: {}",
            report.stats.degenerate_norms, report.stats.sub_tolerance
        );
    }
    println!("{}", "=".repeat(60));
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let data = load_data(&args)?;
    let config = build_config(&args);
    log::debug!("config: {:?}", config);

    println!("Robust Portfolio Selection");
    println!("==========================");

    let report = match args.oracle {
        OracleChoice::ClosedForm => run_with(data.clone(), config, ClosedFormMinimizer)?,
        OracleChoice::ProjectedGradient => {
            run_with(data.clone(), config, ProjectedGradientMinimizer::default())?
        }
    };

    print_report(&data, &report);

    if let Some(path) = &args.json {
        RunSummary::new(&data, &report).save_json(path)?;
        println!("Summary written to {}", path.display());
    }

    Ok(())
}
