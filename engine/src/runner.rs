//! Ensemble Runner - runs every realization of a scenario in parallel
//!
//! Each realization gets a seed derived from the base seed and its uid,
//! so an ensemble is reproducible regardless of thread scheduling.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::parameters::ParameterDraws;
use crate::scenario::Scenario;
use crate::world::{SimulationWorld, Trajectory};
use crate::{npi, parameters};

/// Redraw budget per realization when an acceptance filter is active
pub const MAX_FILTER_ATTEMPTS: u32 = 100;

/// One accepted realization
#[derive(Debug)]
pub struct Realization {
    pub uid: u64,
    /// Draws needed to pass the acceptance filter (1 = first try)
    pub attempts: u32,
    pub draws: ParameterDraws,
    pub trajectory: Trajectory,
}

#[derive(Debug)]
pub struct EnsembleResult {
    pub realizations: Vec<Realization>,
    /// Total filter-rejected draws across the ensemble
    pub rejected: u64,
}

fn realization_seed(base: u64, uid: u64, attempt: u32) -> u64 {
    base.wrapping_add(uid.wrapping_mul(0x9E37_79B9_7F4A_7C15))
        .wrapping_add(u64::from(attempt))
}

/// Run one realization, redrawing until the acceptance filter passes
pub fn run_one(scenario: &Scenario, uid: u64) -> Result<Realization> {
    for attempt in 1..=MAX_FILTER_ATTEMPTS {
        let mut rng = StdRng::seed_from_u64(realization_seed(scenario.base_seed, uid, attempt));

        let reductions = npi::build_schedule(
            scenario.npi_scenario.as_deref(),
            &scenario.interventions,
            &scenario.grid,
            &scenario.geography,
            &mut rng,
        )?;
        let params = parameters::draw(
            &scenario.parameters,
            &reductions,
            &scenario.grid,
            scenario.nnodes(),
            &mut rng,
        )?;
        let importations = scenario
            .seeding
            .draw(&scenario.grid, &scenario.geography, uid, &mut rng)?;

        let draws = params.draws;
        let trajectory = SimulationWorld::new(
            uid,
            &scenario.grid,
            &scenario.geography,
            &scenario.commuting,
            params,
            importations,
            rng,
        )
        .run();

        if scenario.filter.accepts(&trajectory) {
            return Ok(Realization {
                uid,
                attempts: attempt,
                draws,
                trajectory,
            });
        }
        debug!("realization {uid}: draw {attempt} rejected by the acceptance filter");
    }

    Err(EngineError::FilterExhausted {
        uid,
        attempts: MAX_FILTER_ATTEMPTS,
    })
}

/// Run the whole ensemble
pub fn run_ensemble(scenario: &Scenario) -> Result<EnsembleResult> {
    info!(
        "running {} realizations: {} nodes, {} days, dt = {:.4}",
        scenario.nsimulations,
        scenario.nnodes(),
        scenario.grid.ndays(),
        scenario.grid.dt()
    );

    let realizations: Vec<Realization> = (0..scenario.nsimulations as u64)
        .into_par_iter()
        .map(|uid| run_one(scenario, uid))
        .collect::<Result<Vec<_>>>()?;

    let rejected = realizations
        .iter()
        .map(|r| u64::from(r.attempts - 1))
        .sum();

    info!(
        "ensemble complete: {} realizations accepted, {} draws rejected",
        realizations.len(),
        rejected
    );

    Ok(EnsembleResult {
        realizations,
        rejected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compartments::TimeGrid;
    use crate::config::{InterventionsConfig, ParametersConfig};
    use crate::distributions::{Expression, ValueDistribution};
    use crate::filter::AcceptanceFilter;
    use crate::geography::Geography;
    use crate::seeding::{SeedingPlan, SeedingRow};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixed(value: f64) -> ValueDistribution {
        ValueDistribution::Fixed {
            value: Expression::new(value),
        }
    }

    fn test_scenario() -> Scenario {
        let geography = Geography::from_parts(
            vec!["a".to_string(), "b".to_string()],
            vec![5_000, 5_000],
            vec![vec![0.0, 100.0], vec![100.0, 0.0]],
        )
        .unwrap();
        let commuting = geography.commuting();
        let grid = TimeGrid::new(date(2020, 3, 1), date(2020, 4, 1), 0.5).unwrap();
        let filter = AcceptanceFilter::unconstrained(grid.ndays(), geography.nnodes());

        Scenario {
            name: "test".to_string(),
            npi_scenario: None,
            grid,
            geography,
            commuting,
            parameters: ParametersConfig {
                alpha: Expression::new(1.0),
                sigma: Expression::new(1.0 / 5.2),
                gamma: fixed(1.0 / 4.0),
                r0s: fixed(2.5),
            },
            interventions: InterventionsConfig::default(),
            seeding: SeedingPlan::Poisson {
                rows: vec![SeedingRow {
                    place: "a".to_string(),
                    date: date(2020, 3, 1),
                    amount: 15.0,
                }],
            },
            filter,
            outcomes: None,
            nsimulations: 4,
            base_seed: 42,
        }
    }

    #[test]
    fn test_ensemble_runs_all_realizations() {
        let scenario = test_scenario();
        let result = run_ensemble(&scenario).unwrap();
        assert_eq!(result.realizations.len(), 4);
        assert_eq!(result.rejected, 0);
        for (i, r) in result.realizations.iter().enumerate() {
            assert_eq!(r.uid, i as u64);
            assert_eq!(r.attempts, 1);
            assert_eq!(r.trajectory.len(), scenario.grid.ndays() + 1);
        }
    }

    #[test]
    fn test_ensemble_reproducible() {
        let scenario = test_scenario();
        let a = run_ensemble(&scenario).unwrap();
        let b = run_ensemble(&scenario).unwrap();
        for (ra, rb) in a.realizations.iter().zip(&b.realizations) {
            assert_eq!(
                ra.trajectory.total_cumulative_infections(),
                rb.trajectory.total_cumulative_infections()
            );
        }
    }

    #[test]
    fn test_realizations_differ_from_each_other() {
        let scenario = test_scenario();
        let result = run_ensemble(&scenario).unwrap();
        let totals: Vec<u64> = result
            .realizations
            .iter()
            .map(|r| r.trajectory.total_cumulative_infections())
            .collect();
        assert!(totals.iter().any(|&t| t != totals[0]));
    }

    #[test]
    fn test_impossible_filter_exhausts_attempts() {
        let mut scenario = test_scenario();
        // Demand a million cumulative infections in a 10k population
        let rows = vec![vec![1e6; 2]; scenario.grid.ndays()];
        scenario.filter =
            AcceptanceFilter::from_rows(rows, scenario.grid.ndays(), 2).unwrap();
        scenario.nsimulations = 1;

        let err = run_ensemble(&scenario).unwrap_err();
        assert!(matches!(err, EngineError::FilterExhausted { uid: 0, .. }));
    }
}
