//! Importation seeding
//!
//! Outbreaks start from imported infections. Two sources are supported:
//! a Poisson intensity table (place, date, amount) drawn fresh each
//! realization, and a folder of precomputed importation files cycled
//! through by realization uid.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::Deserialize;
use tracing::warn;

use crate::compartments::TimeGrid;
use crate::config::SeedingConfig;
use crate::error::{EngineError, Result};
use crate::geography::Geography;

/// One row of a seeding CSV
#[derive(Debug, Clone, Deserialize)]
pub struct SeedingRow {
    pub place: String,
    pub date: NaiveDate,
    pub amount: f64,
}

/// Seeding inputs resolved against the filesystem once, before any
/// realization runs
#[derive(Debug, Clone)]
pub enum SeedingPlan {
    None,
    /// Poisson intensities, one draw per row per realization
    Poisson { rows: Vec<SeedingRow> },
    /// Importation files; realization uid selects one
    Folder { files: Vec<PathBuf> },
}

/// Imported infections per day per node for one realization
#[derive(Debug, Clone)]
pub struct ImportationSchedule {
    by_day: Vec<Vec<u64>>,
}

impl ImportationSchedule {
    pub fn empty(ndays: usize, nnodes: usize) -> Self {
        Self {
            by_day: vec![vec![0; nnodes]; ndays],
        }
    }

    pub fn amount(&self, day: usize, node: usize) -> u64 {
        self.by_day[day][node]
    }

    pub fn total(&self) -> u64 {
        self.by_day.iter().flatten().sum()
    }
}

impl SeedingPlan {
    /// Resolve a seeding config: read and validate the intensity table, or
    /// enumerate the importation folder
    pub fn resolve(config: &SeedingConfig, geography: &Geography) -> Result<Self> {
        match config {
            SeedingConfig::None => Ok(SeedingPlan::None),
            SeedingConfig::PoissonDistributed { lambda_file } => {
                let file = File::open(lambda_file).map_err(|e| {
                    EngineError::Seeding(format!("cannot open {}: {e}", lambda_file.display()))
                })?;
                let rows = read_seeding_rows(file)?;
                validate_rows(&rows, geography)?;
                Ok(SeedingPlan::Poisson { rows })
            }
            SeedingConfig::FolderDraw { folder_path } => {
                let files = importation_files(folder_path)?;
                Ok(SeedingPlan::Folder { files })
            }
        }
    }

    /// Draw the importation schedule for one realization
    pub fn draw<R: Rng + ?Sized>(
        &self,
        grid: &TimeGrid,
        geography: &Geography,
        uid: u64,
        rng: &mut R,
    ) -> Result<ImportationSchedule> {
        let mut schedule = ImportationSchedule::empty(grid.ndays(), geography.nnodes());
        match self {
            SeedingPlan::None => {}
            SeedingPlan::Poisson { rows } => {
                for row in rows {
                    let Some((day, node)) = row_target(row, grid, geography) else {
                        continue;
                    };
                    if row.amount > 0.0 {
                        let poisson = Poisson::new(row.amount).map_err(|e| {
                            EngineError::Seeding(format!(
                                "invalid Poisson intensity {} for '{}': {e}",
                                row.amount, row.place
                            ))
                        })?;
                        schedule.by_day[day][node] += poisson.sample(rng) as u64;
                    }
                }
            }
            SeedingPlan::Folder { files } => {
                let file = &files[(uid % files.len() as u64) as usize];
                let reader = File::open(file).map_err(|e| {
                    EngineError::Seeding(format!("cannot open {}: {e}", file.display()))
                })?;
                let rows = read_seeding_rows(reader)?;
                validate_rows(&rows, geography)?;
                for row in &rows {
                    let Some((day, node)) = row_target(row, grid, geography) else {
                        continue;
                    };
                    schedule.by_day[day][node] += row.amount.round().max(0.0) as u64;
                }
            }
        }
        Ok(schedule)
    }
}

/// Map a row to its (day, node), skipping rows outside the simulated span
/// (the last simulated day is end_date - 1; nothing after it can progress)
fn row_target(row: &SeedingRow, grid: &TimeGrid, geography: &Geography) -> Option<(usize, usize)> {
    let node = geography.index_of(&row.place)?;
    match grid.day_of_date(row.date) {
        Some(day) if day < grid.ndays() => Some((day, node)),
        _ => {
            warn!(
                "seeding row for '{}' on {} is outside the simulated span, ignoring",
                row.place, row.date
            );
            None
        }
    }
}

pub fn read_seeding_rows<R: Read>(reader: R) -> Result<Vec<SeedingRow>> {
    let mut csv = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in csv.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

fn validate_rows(rows: &[SeedingRow], geography: &Geography) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if geography.index_of(&row.place).is_none() {
            return Err(EngineError::Seeding(format!(
                "invalid place '{}' in row {} of seeding file, not found in geodata",
                row.place,
                i + 1
            )));
        }
        if row.amount < 0.0 {
            return Err(EngineError::Seeding(format!(
                "negative amount {} in row {} of seeding file",
                row.amount,
                i + 1
            )));
        }
        if !seen.insert((row.place.clone(), row.date)) {
            duplicates.push((i + 1).to_string());
        }
    }
    if !duplicates.is_empty() {
        return Err(EngineError::Seeding(format!(
            "repeated place-date in rows {} of seeding file",
            duplicates.join(", ")
        )));
    }
    Ok(())
}

/// Enumerate importation_{n}.csv files in a folder, ordered by n
fn importation_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut numbered = Vec::new();
    let entries = std::fs::read_dir(folder)
        .map_err(|e| EngineError::Seeding(format!("cannot read {}: {e}", folder.display())))?;
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(n) = name
            .strip_prefix("importation_")
            .and_then(|rest| rest.strip_suffix(".csv"))
            .and_then(|num| num.parse::<u64>().ok())
        {
            numbered.push((n, path));
        }
    }
    if numbered.is_empty() {
        return Err(EngineError::Seeding(format!(
            "no importation_<n>.csv files in {}",
            folder.display()
        )));
    }
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}
