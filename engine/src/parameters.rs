//! Per-realization disease parameter draws
//!
//! Each realization draws its own rates, then expands transmissibility
//! into a (day x node) matrix with the intervention reductions applied.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::compartments::{TimeGrid, N_INFECT_STAGES};
use crate::config::ParametersConfig;
use crate::error::{EngineError, Result};
use crate::npi::ReductionSchedule;

/// Scalar draws for one realization, kept alongside its trajectory so a
/// run can be traced back to the rates that produced it
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParameterDraws {
    /// Fraction of the day residents spend at their travel destination
    pub alpha: f64,
    /// Incubation exit rate (E -> I1)
    pub sigma: f64,
    /// Infectious stage exit rate (already scaled by the stage count)
    pub gamma: f64,
    pub r0: f64,
}

/// Drawn parameters plus the expanded, NPI-reduced transmission matrix
#[derive(Debug, Clone)]
pub struct ParameterSet {
    pub draws: ParameterDraws,
    /// beta[day][node]
    beta: Vec<Vec<f64>>,
}

impl ParameterSet {
    pub fn beta(&self, day: usize, node: usize) -> f64 {
        self.beta[day][node]
    }

    /// Per-node transmission rates for one day
    pub fn beta_row(&self, day: usize) -> &[f64] {
        &self.beta[day]
    }
}

/// Draw one realization's parameters.
///
/// The stage exit rate is the configured recovery-rate draw times the
/// number of serial stages, and `beta = R0 * gamma / n_stages`, so R0 is
/// preserved whatever the stage count.
pub fn draw<R: Rng + ?Sized>(
    config: &ParametersConfig,
    npi: &ReductionSchedule,
    grid: &TimeGrid,
    nnodes: usize,
    rng: &mut R,
) -> Result<ParameterSet> {
    let alpha = config.alpha.value();
    let sigma = config.sigma.value();

    let gamma_draw = config.gamma.sample(rng)?;
    if gamma_draw <= 0.0 {
        return Err(EngineError::Config(format!(
            "gamma drew a non-positive rate: {gamma_draw}"
        )));
    }
    let gamma = gamma_draw * N_INFECT_STAGES as f64;

    let r0 = config.r0s.sample(rng)?;
    if r0 < 0.0 {
        return Err(EngineError::Config(format!("R0s drew a negative value: {r0}")));
    }

    let base_beta = r0 * gamma / N_INFECT_STAGES as f64;
    let beta = (0..grid.ndays())
        .map(|day| {
            (0..nnodes)
                .map(|node| base_beta * (1.0 - npi.value(day, node)))
                .collect()
        })
        .collect();

    Ok(ParameterSet {
        draws: ParameterDraws {
            alpha,
            sigma,
            gamma,
            r0,
        },
        beta,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Expression, ValueDistribution};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed(value: f64) -> ValueDistribution {
        ValueDistribution::Fixed {
            value: Expression::new(value),
        }
    }

    fn config() -> ParametersConfig {
        ParametersConfig {
            alpha: Expression::new(0.9),
            sigma: Expression::new(1.0 / 5.2),
            gamma: fixed(1.0 / 4.0),
            r0s: fixed(2.4),
        }
    }

    fn grid() -> TimeGrid {
        TimeGrid::new(
            NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 3, 11).unwrap(),
            1.0 / 6.0,
        )
        .unwrap()
    }

    #[test]
    fn test_beta_recovers_r0() {
        let grid = grid();
        let npi = ReductionSchedule::none(grid.ndays(), 2);
        let mut rng = StdRng::seed_from_u64(3);
        let params = draw(&config(), &npi, &grid, 2, &mut rng).unwrap();

        assert_eq!(params.draws.gamma, 3.0 / 4.0);
        // beta = R0 * gamma / n_stages = R0 * recovery rate
        assert!((params.beta(0, 0) - 2.4 / 4.0).abs() < 1e-12);
        // R0 = beta * n_stages / gamma
        let r0 = params.beta(0, 0) * N_INFECT_STAGES as f64 / params.draws.gamma;
        assert!((r0 - 2.4).abs() < 1e-12);
    }

    #[test]
    fn test_npi_reduces_beta() {
        let grid = grid();
        let config_npi = {
            use crate::config::{InterventionSpec, InterventionTemplate, InterventionsConfig};
            let mut c = InterventionsConfig::default();
            c.settings.insert(
                "Half".to_string(),
                InterventionSpec {
                    template: InterventionTemplate::Reduce,
                    affected_nodes: None,
                    period_start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap(),
                    period_end_date: NaiveDate::from_ymd_opt(2020, 3, 11).unwrap(),
                    value: fixed(0.5),
                },
            );
            c.scenarios.insert("s".to_string(), vec!["Half".to_string()]);
            c
        };
        let geo = crate::geography::Geography::from_parts(
            vec!["a".to_string()],
            vec![100],
            vec![vec![0.0]],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let npi = crate::npi::build_schedule(Some("s"), &config_npi, &grid, &geo, &mut rng).unwrap();

        let params = draw(&config(), &npi, &grid, 1, &mut rng).unwrap();
        assert!((params.beta(0, 0) - 0.5 * 2.4 / 4.0).abs() < 1e-12);
    }
}
