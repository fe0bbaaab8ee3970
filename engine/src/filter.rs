//! Trajectory acceptance filter
//!
//! A (days x nodes) matrix of minimum cumulative-infection counts. An
//! entry of -1 leaves that (day, node) unconstrained. Realizations whose
//! daily cumulative infections fall below any constrained entry are
//! rejected and redrawn, which conditions the ensemble on what is already
//! known about an outbreak.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{EngineError, Result};
use crate::world::Trajectory;

#[derive(Debug, Clone)]
pub struct AcceptanceFilter {
    /// rows[day][node]; negative = unconstrained
    rows: Vec<Vec<f64>>,
    constrained: bool,
}

impl AcceptanceFilter {
    /// Filter that accepts everything
    pub fn unconstrained(ndays: usize, nnodes: usize) -> Self {
        Self {
            rows: vec![vec![-1.0; nnodes]; ndays],
            constrained: false,
        }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>, ndays: usize, nnodes: usize) -> Result<Self> {
        let got_rows = rows.len();
        let got_cols = rows.first().map_or(0, Vec::len);
        if got_rows != ndays || rows.iter().any(|r| r.len() != nnodes) {
            return Err(EngineError::Filter(format!(
                "filter must have dimensions ({ndays}, {nnodes}), got ({got_rows}, {got_cols})"
            )));
        }
        let constrained = rows.iter().flatten().any(|&v| v >= 0.0);
        Ok(Self { rows, constrained })
    }

    /// Load a whitespace-separated matrix from disk
    pub fn load(path: &Path, ndays: usize, nnodes: usize) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| EngineError::Filter(format!("cannot open {}: {e}", path.display())))?;
        Self::from_reader(file, ndays, nnodes)
    }

    pub fn from_reader<R: Read>(mut reader: R, ndays: usize, nnodes: usize) -> Result<Self> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut rows = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let row: Vec<f64> = line
                .split_whitespace()
                .map(|tok| {
                    tok.parse::<f64>().map_err(|_| {
                        EngineError::Filter(format!("invalid value '{tok}' in filter file"))
                    })
                })
                .collect::<Result<_>>()?;
            rows.push(row);
        }
        Self::from_rows(rows, ndays, nnodes)
    }

    pub fn is_unconstrained(&self) -> bool {
        !self.constrained
    }

    /// Row `d` is checked against the end-of-day state for day `d`
    /// (trajectory record `d + 1`; the initial record is never filtered)
    pub fn accepts(&self, trajectory: &Trajectory) -> bool {
        if !self.constrained {
            return true;
        }
        for (day, row) in self.rows.iter().enumerate() {
            for (node, &min) in row.iter().enumerate() {
                if min >= 0.0 && (trajectory.cumulative_infections(day + 1, node) as f64) < min {
                    return false;
                }
            }
        }
        true
    }
}
