//! Healthcare outcome estimates
//!
//! Turns daily onsets into expected hospital-bed occupancy: a share of
//! each day's onsets is admitted after a fixed delay and stays for a
//! fixed number of days.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::world::Trajectory;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OutcomesConfig {
    /// Probability an infection leads to a hospital admission
    pub p_hospitalization: f64,
    /// Days between onset and admission
    #[serde(default = "default_delay")]
    pub admission_delay_days: usize,
    /// Days a bed stays occupied per admission
    #[serde(default = "default_length_of_stay")]
    pub length_of_stay_days: usize,
}

fn default_delay() -> usize {
    7
}

fn default_length_of_stay() -> usize {
    10
}

impl OutcomesConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.p_hospitalization) {
            return Err(EngineError::Config(format!(
                "p_hospitalization must be between 0 and 1, got {}",
                self.p_hospitalization
            )));
        }
        if self.length_of_stay_days == 0 {
            return Err(EngineError::Config(
                "length_of_stay_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Expected occupied beds per day per node for one realization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BedDemand {
    /// occupancy[day][node]; same day indexing as the trajectory records
    pub occupancy: Vec<Vec<f64>>,
}

impl BedDemand {
    /// Day index and bed count of the peak at a node
    pub fn peak(&self, node: usize) -> (usize, f64) {
        let mut best = (0, 0.0);
        for (day, row) in self.occupancy.iter().enumerate() {
            if row[node] > best.1 {
                best = (day, row[node]);
            }
        }
        best
    }

    /// Peak of total beds across all nodes
    pub fn peak_total(&self) -> (usize, f64) {
        let mut best = (0, 0.0);
        for (day, row) in self.occupancy.iter().enumerate() {
            let total: f64 = row.iter().sum();
            if total > best.1 {
                best = (day, total);
            }
        }
        best
    }
}

/// Expected bed occupancy from a trajectory's daily onsets
pub fn bed_demand(trajectory: &Trajectory, config: &OutcomesConfig) -> BedDemand {
    let ndays = trajectory.len();
    let nnodes = trajectory.nnodes();
    let mut occupancy = vec![vec![0.0; nnodes]; ndays];

    for day in 0..ndays {
        for node in 0..nnodes {
            let admissions =
                trajectory.onsets(day, node) as f64 * config.p_hospitalization;
            if admissions == 0.0 {
                continue;
            }
            let start = day + config.admission_delay_days;
            let end = (start + config.length_of_stay_days).min(ndays);
            for occupied_day in start..end {
                occupancy[occupied_day][node] += admissions;
            }
        }
    }

    BedDemand { occupancy }
}
