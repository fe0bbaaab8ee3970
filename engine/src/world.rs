//! Simulation World - one realization's state and dynamics

use chrono::NaiveDate;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::compartments::{Compartment, CompartmentGrid, TimeGrid};
use crate::geography::{Commuting, Geography};
use crate::parameters::ParameterSet;
use crate::seeding::ImportationSchedule;
use crate::systems;

/// Counts from one sub-daily step
pub struct TickResult {
    pub exposures: Vec<u64>,
    pub onsets: Vec<u64>,
    pub recoveries: u64,
}

/// Daily record of one realization: end-of-day compartment snapshots plus
/// the day's onsets per node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub sim_id: u64,
    dates: Vec<NaiveDate>,
    states: Vec<CompartmentGrid>,
    daily_onsets: Vec<Vec<u64>>,
    nnodes: usize,
}

impl Trajectory {
    pub fn new(sim_id: u64, nnodes: usize) -> Self {
        Self {
            sim_id,
            dates: Vec::new(),
            states: Vec::new(),
            daily_onsets: Vec::new(),
            nnodes,
        }
    }

    pub fn push(&mut self, date: NaiveDate, state: CompartmentGrid, onsets: Vec<u64>) {
        self.dates.push(date);
        self.states.push(state);
        self.daily_onsets.push(onsets);
    }

    /// Number of daily records (span days + 1)
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn nnodes(&self) -> usize {
        self.nnodes
    }

    pub fn date(&self, record: usize) -> NaiveDate {
        self.dates[record]
    }

    pub fn state(&self, record: usize) -> &CompartmentGrid {
        &self.states[record]
    }

    pub fn onsets(&self, record: usize, node: usize) -> u64 {
        self.daily_onsets[record][node]
    }

    pub fn cumulative_infections(&self, record: usize, node: usize) -> u64 {
        self.states[record].count(node, Compartment::CumulativeInfections)
    }

    /// Share of a node's population infected by the end of the run
    pub fn attack_rate(&self, node: usize, population: u64) -> f64 {
        if population == 0 || self.is_empty() {
            return 0.0;
        }
        self.cumulative_infections(self.len() - 1, node) as f64 / population as f64
    }

    /// Record index and size of the node's infectious-prevalence peak
    pub fn peak_prevalence(&self, node: usize) -> (usize, u64) {
        let mut best = (0, 0);
        for (record, state) in self.states.iter().enumerate() {
            let prevalence = state.infectious(node);
            if prevalence > best.1 {
                best = (record, prevalence);
            }
        }
        best
    }

    pub fn total_cumulative_infections(&self) -> u64 {
        match self.states.last() {
            Some(state) => state.total(Compartment::CumulativeInfections),
            None => 0,
        }
    }
}

/// One realization's worth of simulation state
pub struct SimulationWorld<'a> {
    uid: u64,
    grid: &'a TimeGrid,
    geography: &'a Geography,
    commuting: &'a Commuting,
    params: ParameterSet,
    importations: ImportationSchedule,
    state: CompartmentGrid,
    step: usize,
    rng: StdRng,
}

impl<'a> SimulationWorld<'a> {
    pub fn new(
        uid: u64,
        grid: &'a TimeGrid,
        geography: &'a Geography,
        commuting: &'a Commuting,
        params: ParameterSet,
        importations: ImportationSchedule,
        rng: StdRng,
    ) -> Self {
        Self {
            uid,
            grid,
            geography,
            commuting,
            params,
            importations,
            state: CompartmentGrid::from_populations(geography.populations()),
            step: 0,
            rng,
        }
    }

    pub fn state(&self) -> &CompartmentGrid {
        &self.state
    }

    /// Day index the next tick falls in
    pub fn day(&self) -> usize {
        self.grid.day_of_step(self.step)
    }

    /// Run one sub-daily step: transmission, then progression
    pub fn tick(&mut self) -> TickResult {
        let day = self.day();
        let dt = self.grid.dt();

        let exposures = systems::transmission_system(
            &mut self.state,
            self.params.beta_row(day),
            self.params.draws.alpha,
            self.commuting,
            self.geography.populations(),
            dt,
            &mut self.rng,
        );
        let progression = systems::progression_system(
            &mut self.state,
            self.params.draws.sigma,
            self.params.draws.gamma,
            dt,
            &mut self.rng,
        );

        self.step += 1;
        TickResult {
            exposures,
            onsets: progression.onsets,
            recoveries: progression.recoveries,
        }
    }

    /// Move the day's importations from S to E, clamped by available S
    fn apply_importations(&mut self, day: usize) {
        for node in 0..self.state.nnodes() {
            let amount = self.importations.amount(day, node);
            if amount == 0 {
                continue;
            }
            let moved = amount.min(self.state.count(node, Compartment::Susceptible));
            self.state.sub(node, Compartment::Susceptible, moved);
            self.state.add(node, Compartment::Exposed, moved);
        }
    }

    /// Run the full span, producing one daily record per calendar date
    pub fn run(mut self) -> Trajectory {
        let nnodes = self.state.nnodes();
        let steps_per_day = self.grid.steps_per_day();
        let mut trajectory = Trajectory::new(self.uid, nnodes);
        trajectory.push(self.grid.start(), self.state.clone(), vec![0; nnodes]);

        for day in 0..self.grid.ndays() {
            self.apply_importations(day);

            let mut day_onsets = vec![0u64; nnodes];
            for _ in 0..steps_per_day {
                let result = self.tick();
                for (total, onsets) in day_onsets.iter_mut().zip(&result.onsets) {
                    *total += onsets;
                }
            }

            trajectory.push(
                self.grid.date_of_day(day + 1),
                self.state.clone(),
                day_onsets,
            );
        }

        trajectory
    }
}
