//! EpiPlan Engine Benchmark
//!
//! Standalone benchmark: a synthetic ring of jurisdictions, one ensemble,
//! timing and memory reported at the end.

use chrono::NaiveDate;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use engine::compartments::TimeGrid;
use engine::config::{InterventionsConfig, ParametersConfig};
use engine::distributions::{Expression, ValueDistribution};
use engine::filter::AcceptanceFilter;
use engine::geography::Geography;
use engine::seeding::{SeedingPlan, SeedingRow};
use engine::{run_ensemble, Scenario};

const NODES: usize = 20;
const POPULATION_PER_NODE: u64 = 500_000;
const DAILY_TRAVELERS: f64 = 2_000.0;
const REALIZATIONS: usize = 10;

fn synthetic_scenario() -> anyhow::Result<Scenario> {
    let names: Vec<String> = (0..NODES).map(|i| format!("node_{i:02}")).collect();
    let populations = vec![POPULATION_PER_NODE; NODES];

    // Ring topology: each node trades travelers with its two neighbors
    let mut mobility = vec![vec![0.0; NODES]; NODES];
    for i in 0..NODES {
        mobility[i][(i + 1) % NODES] = DAILY_TRAVELERS;
        mobility[i][(i + NODES - 1) % NODES] = DAILY_TRAVELERS;
    }
    let geography = Geography::from_parts(names, populations, mobility)?;
    let commuting = geography.commuting();

    let start = NaiveDate::from_ymd_opt(2020, 1, 31).expect("valid date");
    let end = NaiveDate::from_ymd_opt(2020, 7, 29).expect("valid date");
    let grid = TimeGrid::new(start, end, 1.0 / 6.0)?;
    let filter = AcceptanceFilter::unconstrained(grid.ndays(), geography.nnodes());

    let seeding = SeedingPlan::Poisson {
        rows: (0..7)
            .map(|day| SeedingRow {
                place: "node_00".to_string(),
                date: start + chrono::Duration::days(day),
                amount: 5.0,
            })
            .collect(),
    };

    Ok(Scenario {
        name: "bench".to_string(),
        npi_scenario: None,
        grid,
        geography,
        commuting,
        parameters: ParametersConfig {
            alpha: Expression::new(1.0),
            sigma: Expression::new(1.0 / 5.2),
            gamma: ValueDistribution::Uniform {
                low: Expression::new(1.0 / 6.0),
                high: Expression::new(1.0 / 2.6),
            },
            r0s: ValueDistribution::Uniform {
                low: Expression::new(2.0),
                high: Expression::new(3.0),
            },
        },
        interventions: InterventionsConfig::default(),
        seeding,
        filter,
        outcomes: None,
        nsimulations: REALIZATIONS,
        base_seed: 42,
    })
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("EpiPlan engine benchmark starting...");
    let scenario = synthetic_scenario()?;
    info!(
        "synthetic scenario: {} nodes, {} days, {} realizations",
        scenario.nnodes(),
        scenario.grid.ndays(),
        scenario.nsimulations
    );

    let start = std::time::Instant::now();
    let result = run_ensemble(&scenario)?;
    let elapsed = start.elapsed();

    let median_infections = {
        let mut totals: Vec<u64> = result
            .realizations
            .iter()
            .map(|r| r.trajectory.total_cumulative_infections())
            .collect();
        totals.sort_unstable();
        totals[totals.len() / 2]
    };

    info!(
        "benchmark complete: {:?} total, {:?} per realization, median {} infections",
        elapsed,
        elapsed / REALIZATIONS as u32,
        median_infections
    );

    if let Some(stats) = memory_stats::memory_stats() {
        info!(
            "physical memory in use: {:.1} MB",
            stats.physical_mem as f64 / (1024.0 * 1024.0)
        );
    }

    Ok(())
}
