//! Compartments and the simulation time grid
//!
//! Disease state is tracked as aggregate integer counts per node, not per
//! person. Seven compartments: S, E, three serial infectious stages, R, and
//! a cumulative-infection counter.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Number of compartments tracked per node
pub const NCOMP: usize = 7;

/// Number of serial infectious stages (gives a gamma-distributed
/// infectious period)
pub const N_INFECT_STAGES: usize = 3;

// ============================================================================
// Compartments
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infectious1,
    Infectious2,
    Infectious3,
    Recovered,
    /// Running total of infections (onsets), not a state people occupy
    CumulativeInfections,
}

impl Compartment {
    pub const ALL: [Compartment; NCOMP] = [
        Compartment::Susceptible,
        Compartment::Exposed,
        Compartment::Infectious1,
        Compartment::Infectious2,
        Compartment::Infectious3,
        Compartment::Recovered,
        Compartment::CumulativeInfections,
    ];

    pub fn index(self) -> usize {
        match self {
            Compartment::Susceptible => 0,
            Compartment::Exposed => 1,
            Compartment::Infectious1 => 2,
            Compartment::Infectious2 => 3,
            Compartment::Infectious3 => 4,
            Compartment::Recovered => 5,
            Compartment::CumulativeInfections => 6,
        }
    }

    /// Short label used in output files
    pub fn label(self) -> &'static str {
        match self {
            Compartment::Susceptible => "S",
            Compartment::Exposed => "E",
            Compartment::Infectious1 => "I1",
            Compartment::Infectious2 => "I2",
            Compartment::Infectious3 => "I3",
            Compartment::Recovered => "R",
            Compartment::CumulativeInfections => "cumI",
        }
    }
}

/// Compartment counts for every node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompartmentGrid {
    counts: Vec<[u64; NCOMP]>,
}

impl CompartmentGrid {
    /// Empty grid (all compartments zero)
    pub fn new(nnodes: usize) -> Self {
        Self {
            counts: vec![[0; NCOMP]; nnodes],
        }
    }

    /// Fully susceptible grid from node populations
    pub fn from_populations(populations: &[u64]) -> Self {
        let mut grid = Self::new(populations.len());
        for (node, &pop) in populations.iter().enumerate() {
            grid.counts[node][Compartment::Susceptible.index()] = pop;
        }
        grid
    }

    pub fn nnodes(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, node: usize, comp: Compartment) -> u64 {
        self.counts[node][comp.index()]
    }

    pub fn set(&mut self, node: usize, comp: Compartment, value: u64) {
        self.counts[node][comp.index()] = value;
    }

    pub fn add(&mut self, node: usize, comp: Compartment, amount: u64) {
        self.counts[node][comp.index()] += amount;
    }

    pub fn sub(&mut self, node: usize, comp: Compartment, amount: u64) {
        let c = &mut self.counts[node][comp.index()];
        *c = c.saturating_sub(amount);
    }

    /// Total infectious prevalence at a node (I1 + I2 + I3)
    pub fn infectious(&self, node: usize) -> u64 {
        self.count(node, Compartment::Infectious1)
            + self.count(node, Compartment::Infectious2)
            + self.count(node, Compartment::Infectious3)
    }

    /// People at a node across the living compartments (cumI excluded).
    /// Constant over a run: transitions only move people between these.
    pub fn living(&self, node: usize) -> u64 {
        Compartment::ALL
            .iter()
            .filter(|&&c| c != Compartment::CumulativeInfections)
            .map(|&c| self.count(node, c))
            .sum()
    }

    /// Sum of one compartment across all nodes
    pub fn total(&self, comp: Compartment) -> u64 {
        (0..self.nnodes()).map(|n| self.count(n, comp)).sum()
    }
}

// ============================================================================
// Time grid
// ============================================================================

/// Simulation time grid: calendar span [ti, tf] walked in sub-daily steps.
///
/// Steps per day is `round(1/dt)` so day boundaries fall exactly on steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeGrid {
    ti: NaiveDate,
    tf: NaiveDate,
    steps_per_day: u32,
}

impl TimeGrid {
    pub fn new(ti: NaiveDate, tf: NaiveDate, dt: f64) -> Result<Self> {
        if tf <= ti {
            return Err(EngineError::Config(format!(
                "end_date ({tf}) must be after start_date ({ti})"
            )));
        }
        if !(dt.is_finite() && dt > 0.0 && dt <= 1.0) {
            return Err(EngineError::Config(format!(
                "dt must be in (0, 1] days, got {dt}"
            )));
        }
        let steps_per_day = (1.0 / dt).round().max(1.0) as u32;
        Ok(Self {
            ti,
            tf,
            steps_per_day,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.ti
    }

    pub fn end(&self) -> NaiveDate {
        self.tf
    }

    /// Whole days simulated (the span tf - ti)
    pub fn ndays(&self) -> usize {
        (self.tf - self.ti).num_days() as usize
    }

    pub fn steps_per_day(&self) -> u32 {
        self.steps_per_day
    }

    /// Effective step size in days
    pub fn dt(&self) -> f64 {
        1.0 / f64::from(self.steps_per_day)
    }

    /// Total sub-daily steps across the span
    pub fn nsteps(&self) -> usize {
        self.ndays() * self.steps_per_day as usize
    }

    /// Day index a given step falls in
    pub fn day_of_step(&self, step: usize) -> usize {
        step / self.steps_per_day as usize
    }

    pub fn date_of_day(&self, day: usize) -> NaiveDate {
        self.ti + Duration::days(day as i64)
    }

    /// Day index of a calendar date, if it falls inside [ti, tf]
    pub fn day_of_date(&self, date: NaiveDate) -> Option<usize> {
        if date < self.ti || date > self.tf {
            return None;
        }
        Some((date - self.ti).num_days() as usize)
    }
}
