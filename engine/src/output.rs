//! Output writing and ensemble summaries
//!
//! Per-realization trajectories go out as wide CSV frames (and optionally
//! a compact binary form); the ensemble is condensed into a JSON summary
//! of per-node attack rates, peaks, and bed demand.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::compartments::Compartment;
use crate::error::Result;
use crate::geography::Geography;
use crate::outcomes;
use crate::runner::EnsembleResult;
use crate::scenario::Scenario;
use crate::world::Trajectory;

// ============================================================================
// Writers
// ============================================================================

/// Manages the output directory for one setup
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// `<root>/<setup_name>/`, created on demand
    pub fn create(root: &Path, setup_name: &str) -> Result<Self> {
        let dir = root.join(setup_name);
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_trajectory_csv(
        &self,
        trajectory: &Trajectory,
        geography: &Geography,
    ) -> Result<PathBuf> {
        let path = self.dir.join(format!("{:09}.seir.csv", trajectory.sim_id));
        let file = BufWriter::new(File::create(&path)?);
        write_trajectory(file, trajectory, geography)?;
        Ok(path)
    }

    pub fn write_trajectory_binary(&self, trajectory: &Trajectory) -> Result<PathBuf> {
        let path = self.dir.join(format!("{:09}.seir.bin", trajectory.sim_id));
        let file = BufWriter::new(File::create(&path)?);
        bincode::serialize_into(file, trajectory)?;
        Ok(path)
    }

    pub fn write_summary(&self, summary: &EnsembleSummary) -> Result<PathBuf> {
        let path = self.dir.join("summary.json");
        let mut file = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut file, summary)?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(path)
    }
}

/// Wide trajectory frame: `time,comp,<node names...>`, one row per
/// (date, compartment)
pub fn write_trajectory<W: Write>(
    writer: W,
    trajectory: &Trajectory,
    geography: &Geography,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["time".to_string(), "comp".to_string()];
    header.extend(geography.names().iter().cloned());
    csv.write_record(&header)?;

    for record in 0..trajectory.len() {
        let date = trajectory.date(record).to_string();
        for comp in Compartment::ALL {
            let mut row = vec![date.clone(), comp.label().to_string()];
            for node in 0..trajectory.nnodes() {
                row.push(trajectory.state(record).count(node, comp).to_string());
            }
            csv.write_record(&row)?;
        }
    }
    csv.flush()?;
    Ok(())
}

// ============================================================================
// Ensemble summary
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Quantiles {
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub population: u64,
    pub attack_rate: Quantiles,
    pub peak_prevalence: Quantiles,
    /// Median date of the infectious-prevalence peak
    pub peak_date: NaiveDate,
    /// Present when outcomes are configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_beds: Option<Quantiles>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnsembleSummary {
    pub setup_name: String,
    pub npi_scenario: Option<String>,
    pub nsimulations: usize,
    pub rejected_draws: u64,
    /// Attack rate over the whole geography
    pub overall_attack_rate: Quantiles,
    pub nodes: Vec<NodeSummary>,
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (q * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx]
}

pub fn quantiles(mut values: Vec<f64>) -> Quantiles {
    values.sort_by(f64::total_cmp);
    Quantiles {
        p25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        p75: quantile(&values, 0.75),
    }
}

/// Condense an ensemble into per-node planning quantiles
pub fn summarize(scenario: &Scenario, result: &EnsembleResult) -> EnsembleSummary {
    let geography = &scenario.geography;
    let total_population = geography.total_population();

    let bed_demands: Option<Vec<outcomes::BedDemand>> = scenario.outcomes.as_ref().map(|cfg| {
        result
            .realizations
            .iter()
            .map(|r| outcomes::bed_demand(&r.trajectory, cfg))
            .collect()
    });

    let mut nodes = Vec::with_capacity(geography.nnodes());
    for node in 0..geography.nnodes() {
        let population = geography.populations()[node];

        let attack_rates: Vec<f64> = result
            .realizations
            .iter()
            .map(|r| r.trajectory.attack_rate(node, population))
            .collect();

        let mut peak_records = Vec::with_capacity(result.realizations.len());
        let mut peak_sizes = Vec::with_capacity(result.realizations.len());
        for r in &result.realizations {
            let (record, size) = r.trajectory.peak_prevalence(node);
            peak_records.push(record as f64);
            peak_sizes.push(size as f64);
        }
        let median_peak_record = quantiles(peak_records).median.round() as usize;

        let peak_beds = bed_demands.as_ref().map(|demands| {
            quantiles(demands.iter().map(|d| d.peak(node).1).collect())
        });

        nodes.push(NodeSummary {
            name: geography.names()[node].clone(),
            population,
            attack_rate: quantiles(attack_rates),
            peak_prevalence: quantiles(peak_sizes),
            peak_date: scenario.grid.date_of_day(median_peak_record),
            peak_beds,
        });
    }

    let overall: Vec<f64> = result
        .realizations
        .iter()
        .map(|r| {
            if total_population == 0 {
                0.0
            } else {
                r.trajectory.total_cumulative_infections() as f64 / total_population as f64
            }
        })
        .collect();

    EnsembleSummary {
        setup_name: scenario.name.clone(),
        npi_scenario: scenario.npi_scenario.clone(),
        nsimulations: result.realizations.len(),
        rejected_draws: result.rejected,
        overall_attack_rate: quantiles(overall),
        nodes,
    }
}
