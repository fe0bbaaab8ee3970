//! EpiPlan CLI
//!
//! Loads a scenario configuration, runs the ensemble, and writes
//! trajectories and the planning summary.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use engine::output::{self, EnsembleSummary, OutputWriter};
use engine::{run_ensemble, Scenario, ScenarioConfig};

#[derive(Parser)]
#[command(
    name = "epiplan",
    version,
    about = "Scenario-based epidemic planning simulator"
)]
struct Cli {
    /// Scenario configuration file
    #[arg(short, long, default_value = "config.yml")]
    config: PathBuf,

    /// Intervention scenario to apply (omit to run without interventions)
    #[arg(short = 's', long)]
    npi_scenario: Option<String>,

    /// Override the configured number of realizations
    #[arg(short, long)]
    nsimulations: Option<usize>,

    /// Override the configured base seed
    #[arg(long)]
    seed: Option<u64>,

    /// Root directory for outputs
    #[arg(short, long, default_value = "model_output")]
    output: PathBuf,

    /// Skip per-realization CSV trajectories
    #[arg(long)]
    no_csv: bool,

    /// Also write compact binary trajectories
    #[arg(long)]
    binary: bool,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = ScenarioConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(n) = cli.nsimulations {
        config.nsimulations = n;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let base_dir = cli.config.parent().unwrap_or_else(|| Path::new("."));
    let scenario = Scenario::from_config(config, cli.npi_scenario.clone(), base_dir)
        .context("assembling scenario")?;

    info!(
        "scenario '{}': {} nodes, {} days, {} realizations",
        scenario.name,
        scenario.nnodes(),
        scenario.grid.ndays(),
        scenario.nsimulations
    );
    match &scenario.npi_scenario {
        Some(name) => info!("intervention scenario: {name}"),
        None => info!("intervention scenario: none"),
    }

    let started = std::time::Instant::now();
    let result = run_ensemble(&scenario)?;
    info!(
        "{} realizations in {:?} ({} rejected draws)",
        result.realizations.len(),
        started.elapsed(),
        result.rejected
    );

    let writer = OutputWriter::create(&cli.output, &scenario.name)?;
    for realization in &result.realizations {
        if !cli.no_csv {
            writer.write_trajectory_csv(&realization.trajectory, &scenario.geography)?;
        }
        if cli.binary {
            writer.write_trajectory_binary(&realization.trajectory)?;
        }
    }

    let summary = output::summarize(&scenario, &result);
    let summary_path = writer.write_summary(&summary)?;
    info!("summary written to {}", summary_path.display());

    log_summary(&summary);
    info!("estimates are scenario-conditional planning inputs, not forecasts");

    Ok(())
}

fn log_summary(summary: &EnsembleSummary) {
    info!(
        "overall attack rate: {:.3} (IQR {:.3}-{:.3})",
        summary.overall_attack_rate.median,
        summary.overall_attack_rate.p25,
        summary.overall_attack_rate.p75
    );
    for node in &summary.nodes {
        match &node.peak_beds {
            Some(beds) => info!(
                "{}: attack rate {:.3}, peak prevalence {:.0} around {}, peak beds {:.0}",
                node.name,
                node.attack_rate.median,
                node.peak_prevalence.median,
                node.peak_date,
                beds.median
            ),
            None => info!(
                "{}: attack rate {:.3}, peak prevalence {:.0} around {}",
                node.name,
                node.attack_rate.median,
                node.peak_prevalence.median,
                node.peak_date
            ),
        }
    }
}
