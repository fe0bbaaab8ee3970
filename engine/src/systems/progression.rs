//! Progression System
//!
//! Moves people through incubation and the serial infectious stages:
//! E -> I1 -> I2 -> I3 -> R. The E -> I1 transition is the onset event
//! and increments the cumulative infection counter.

use rand::Rng;

use crate::compartments::{Compartment, CompartmentGrid};
use crate::systems::{draw_binomial, transition_probability};

pub struct ProgressionResult {
    /// New onsets (E -> I1) per node
    pub onsets: Vec<u64>,
    pub recoveries: u64,
}

/// Advance disease progression for one step. `sigma` is the incubation
/// exit rate, `gamma` the stage exit rate. Draws are taken against the
/// pre-step counts so a person cannot cross two stages in one step.
pub fn progression_system<R: Rng + ?Sized>(
    state: &mut CompartmentGrid,
    sigma: f64,
    gamma: f64,
    dt: f64,
    rng: &mut R,
) -> ProgressionResult {
    let p_onset = transition_probability(sigma, dt);
    let p_stage = transition_probability(gamma, dt);

    let nnodes = state.nnodes();
    let mut onsets = vec![0; nnodes];
    let mut recoveries = 0;

    for node in 0..nnodes {
        let exposed = state.count(node, Compartment::Exposed);
        let i1 = state.count(node, Compartment::Infectious1);
        let i2 = state.count(node, Compartment::Infectious2);
        let i3 = state.count(node, Compartment::Infectious3);

        let new_onsets = draw_binomial(exposed, p_onset, rng);
        let out1 = draw_binomial(i1, p_stage, rng);
        let out2 = draw_binomial(i2, p_stage, rng);
        let out3 = draw_binomial(i3, p_stage, rng);

        state.sub(node, Compartment::Exposed, new_onsets);
        state.add(node, Compartment::Infectious1, new_onsets);
        state.sub(node, Compartment::Infectious1, out1);
        state.add(node, Compartment::Infectious2, out1);
        state.sub(node, Compartment::Infectious2, out2);
        state.add(node, Compartment::Infectious3, out2);
        state.sub(node, Compartment::Infectious3, out3);
        state.add(node, Compartment::Recovered, out3);
        state.add(node, Compartment::CumulativeInfections, new_onsets);

        onsets[node] = new_onsets;
        recoveries += out3;
    }

    ProgressionResult { onsets, recoveries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_everyone_progresses_at_extreme_rates() {
        let mut state = CompartmentGrid::new(1);
        state.add(0, Compartment::Exposed, 100);
        state.add(0, Compartment::Infectious3, 40);

        let mut rng = StdRng::seed_from_u64(2);
        let result = progression_system(&mut state, 1e9, 1e9, 1.0, &mut rng);

        assert_eq!(result.onsets[0], 100);
        assert_eq!(result.recoveries, 40);
        assert_eq!(state.count(0, Compartment::Exposed), 0);
        assert_eq!(state.count(0, Compartment::Infectious1), 100);
        assert_eq!(state.count(0, Compartment::Recovered), 40);
        assert_eq!(state.count(0, Compartment::CumulativeInfections), 100);
    }

    #[test]
    fn test_single_stage_hop_per_step() {
        // With everyone forced out of I1, nobody should reach I3 in one step
        let mut state = CompartmentGrid::new(1);
        state.add(0, Compartment::Infectious1, 50);

        let mut rng = StdRng::seed_from_u64(2);
        progression_system(&mut state, 1e9, 1e9, 1.0, &mut rng);

        assert_eq!(state.count(0, Compartment::Infectious1), 0);
        assert_eq!(state.count(0, Compartment::Infectious2), 50);
        assert_eq!(state.count(0, Compartment::Infectious3), 0);
    }

    #[test]
    fn test_population_conserved() {
        let mut state = CompartmentGrid::new(1);
        state.add(0, Compartment::Susceptible, 500);
        state.add(0, Compartment::Exposed, 100);
        state.add(0, Compartment::Infectious1, 30);
        state.add(0, Compartment::Infectious2, 20);
        state.add(0, Compartment::Infectious3, 10);

        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            progression_system(&mut state, 0.2, 0.75, 1.0 / 6.0, &mut rng);
            assert_eq!(state.living(0), 660);
        }
        // Eventually everyone who was in the pipeline recovers
        let mut rng = StdRng::seed_from_u64(10);
        for _ in 0..10_000 {
            progression_system(&mut state, 0.2, 0.75, 1.0 / 6.0, &mut rng);
        }
        assert_eq!(state.count(0, Compartment::Recovered), 160);
    }
}
