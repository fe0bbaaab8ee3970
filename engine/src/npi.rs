//! Non-pharmaceutical intervention schedules
//!
//! A scenario names an ordered list of intervention settings; each setting
//! reduces transmission on a subset of nodes over a date range. The
//! schedule is rebuilt per realization because reduction values may be
//! drawn from distributions.

use rand::Rng;

use crate::compartments::TimeGrid;
use crate::config::InterventionsConfig;
use crate::error::{EngineError, Result};
use crate::geography::Geography;

/// Per-day, per-node transmission reduction in [0, 1]
#[derive(Debug, Clone)]
pub struct ReductionSchedule {
    values: Vec<Vec<f64>>,
}

impl ReductionSchedule {
    /// No intervention anywhere
    pub fn none(ndays: usize, nnodes: usize) -> Self {
        Self {
            values: vec![vec![0.0; nnodes]; ndays],
        }
    }

    pub fn value(&self, day: usize, node: usize) -> f64 {
        self.values[day][node]
    }

    /// Largest reduction anywhere in the schedule
    pub fn max_reduction(&self) -> f64 {
        self.values
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }
}

/// Check a scenario's cross-references without drawing anything:
/// the scenario exists, its settings exist, and every affected node is in
/// the geodata
pub fn validate_scenario(
    scenario: &str,
    config: &InterventionsConfig,
    geography: &Geography,
) -> Result<()> {
    let settings = config.scenarios.get(scenario).ok_or_else(|| {
        EngineError::Config(format!("unknown intervention scenario '{scenario}'"))
    })?;
    for name in settings {
        let spec = config.settings.get(name).ok_or_else(|| {
            EngineError::Config(format!("unknown intervention setting '{name}'"))
        })?;
        if let Some(nodes) = &spec.affected_nodes {
            for node in nodes {
                if geography.index_of(node).is_none() {
                    return Err(EngineError::Config(format!(
                        "intervention '{name}' affects unknown node '{node}'"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Build the reduction schedule for one realization.
///
/// `npi_scenario = None` means no interventions, matching a run without a
/// scenario selection. Overlapping interventions on the same node combine
/// as complements: `1 - (1 - a)(1 - b)`.
pub fn build_schedule<R: Rng + ?Sized>(
    npi_scenario: Option<&str>,
    config: &InterventionsConfig,
    grid: &TimeGrid,
    geography: &Geography,
    rng: &mut R,
) -> Result<ReductionSchedule> {
    let ndays = grid.ndays();
    let nnodes = geography.nnodes();
    let mut schedule = ReductionSchedule::none(ndays, nnodes);

    let Some(scenario) = npi_scenario else {
        return Ok(schedule);
    };
    let settings = config.scenarios.get(scenario).ok_or_else(|| {
        EngineError::Config(format!("unknown intervention scenario '{scenario}'"))
    })?;

    for name in settings {
        let spec = config.settings.get(name).ok_or_else(|| {
            EngineError::Config(format!("unknown intervention setting '{name}'"))
        })?;

        let value = spec.value.sample(rng)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(EngineError::Config(format!(
                "intervention '{name}' drew a reduction of {value}, outside [0, 1]"
            )));
        }

        let nodes: Vec<usize> = match &spec.affected_nodes {
            None => (0..nnodes).collect(),
            Some(names) => names
                .iter()
                .map(|n| {
                    geography.index_of(n).ok_or_else(|| {
                        EngineError::Config(format!(
                            "intervention '{name}' affects unknown node '{n}'"
                        ))
                    })
                })
                .collect::<Result<_>>()?,
        };

        // Clip the intervention period to the simulated span
        if spec.period_end_date < grid.start() || spec.period_start_date > grid.end() {
            continue;
        }
        let first = grid.day_of_date(spec.period_start_date).unwrap_or(0);
        let last = grid
            .day_of_date(spec.period_end_date)
            .unwrap_or(ndays)
            .min(ndays.saturating_sub(1));

        for day in first..=last {
            for &node in &nodes {
                let current = schedule.values[day][node];
                schedule.values[day][node] = 1.0 - (1.0 - current) * (1.0 - value);
            }
        }
    }

    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InterventionSpec, InterventionTemplate};
    use crate::distributions::{Expression, ValueDistribution};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn geography() -> Geography {
        Geography::from_parts(
            vec!["a".to_string(), "b".to_string()],
            vec![1000, 1000],
            vec![vec![0.0, 10.0], vec![10.0, 0.0]],
        )
        .unwrap()
    }

    fn fixed(value: f64) -> ValueDistribution {
        ValueDistribution::Fixed {
            value: Expression::new(value),
        }
    }

    fn spec(start: NaiveDate, end: NaiveDate, value: f64, nodes: Option<Vec<String>>) -> InterventionSpec {
        InterventionSpec {
            template: InterventionTemplate::Reduce,
            affected_nodes: nodes,
            period_start_date: start,
            period_end_date: end,
            value: fixed(value),
        }
    }

    fn config_with(settings: Vec<(&str, InterventionSpec)>, scenario: Vec<&str>) -> InterventionsConfig {
        let mut config = InterventionsConfig::default();
        for (name, spec) in settings {
            config.settings.insert(name.to_string(), spec);
        }
        config
            .scenarios
            .insert("test".to_string(), scenario.into_iter().map(String::from).collect());
        config
    }

    #[test]
    fn test_no_scenario_means_no_reduction() {
        let grid = TimeGrid::new(date(2020, 3, 1), date(2020, 3, 11), 0.5).unwrap();
        let config = InterventionsConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let schedule = build_schedule(None, &config, &grid, &geography(), &mut rng).unwrap();
        assert_eq!(schedule.max_reduction(), 0.0);
    }

    #[test]
    fn test_reduction_applies_inside_window_only() {
        let grid = TimeGrid::new(date(2020, 3, 1), date(2020, 3, 11), 0.5).unwrap();
        let config = config_with(
            vec![(
                "Close",
                spec(date(2020, 3, 3), date(2020, 3, 5), 0.4, Some(vec!["b".to_string()])),
            )],
            vec!["Close"],
        );
        let mut rng = StdRng::seed_from_u64(1);
        let schedule = build_schedule(Some("test"), &config, &grid, &geography(), &mut rng).unwrap();

        assert_eq!(schedule.value(1, 1), 0.0);
        assert!((schedule.value(2, 1) - 0.4).abs() < 1e-12);
        assert!((schedule.value(4, 1) - 0.4).abs() < 1e-12);
        assert_eq!(schedule.value(5, 1), 0.0);
        // Node 'a' untouched
        assert_eq!(schedule.value(3, 0), 0.0);
    }

    #[test]
    fn test_overlapping_interventions_combine_as_complements() {
        let grid = TimeGrid::new(date(2020, 3, 1), date(2020, 3, 11), 0.5).unwrap();
        let config = config_with(
            vec![
                ("A", spec(date(2020, 3, 1), date(2020, 3, 11), 0.5, None)),
                ("B", spec(date(2020, 3, 1), date(2020, 3, 11), 0.5, None)),
            ],
            vec!["A", "B"],
        );
        let mut rng = StdRng::seed_from_u64(1);
        let schedule = build_schedule(Some("test"), &config, &grid, &geography(), &mut rng).unwrap();
        assert!((schedule.value(0, 0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_period_clipped_to_span() {
        let grid = TimeGrid::new(date(2020, 3, 1), date(2020, 3, 11), 0.5).unwrap();
        let config = config_with(
            vec![("Early", spec(date(2020, 2, 1), date(2020, 3, 2), 0.3, None))],
            vec!["Early"],
        );
        let mut rng = StdRng::seed_from_u64(1);
        let schedule = build_schedule(Some("test"), &config, &grid, &geography(), &mut rng).unwrap();
        assert!((schedule.value(0, 0) - 0.3).abs() < 1e-12);
        assert!((schedule.value(1, 0) - 0.3).abs() < 1e-12);
        assert_eq!(schedule.value(2, 0), 0.0);
    }

    #[test]
    fn test_unknown_scenario_and_node_errors() {
        let grid = TimeGrid::new(date(2020, 3, 1), date(2020, 3, 11), 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let err = build_schedule(
            Some("missing"),
            &InterventionsConfig::default(),
            &grid,
            &geography(),
            &mut rng,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown intervention scenario"));

        let config = config_with(
            vec![(
                "Bad",
                spec(date(2020, 3, 1), date(2020, 3, 5), 0.2, Some(vec!["zzz".to_string()])),
            )],
            vec!["Bad"],
        );
        let err = build_schedule(Some("test"), &config, &grid, &geography(), &mut rng).unwrap_err();
        assert!(err.to_string().contains("unknown node 'zzz'"));
    }
}
