//! Transmission System
//!
//! Exposes susceptibles to infection. The force of infection at a node
//! mixes local prevalence with the prevalence at nodes its residents
//! travel to, weighted by the commuting fractions and the share of the
//! day spent away.

use rand::Rng;

use crate::compartments::{Compartment, CompartmentGrid};
use crate::geography::Commuting;
use crate::systems::{draw_binomial, transition_probability};

/// Expose susceptibles for one step. `beta` holds the per-node
/// transmission rates for the current day. Returns new exposures per node.
pub fn transmission_system<R: Rng + ?Sized>(
    state: &mut CompartmentGrid,
    beta: &[f64],
    alpha: f64,
    commuting: &Commuting,
    populations: &[u64],
    dt: f64,
    rng: &mut R,
) -> Vec<u64> {
    let nnodes = state.nnodes();

    // Per-node hazard from local prevalence
    let lambda: Vec<f64> = (0..nnodes)
        .map(|node| {
            let pop = populations[node];
            if pop == 0 {
                return 0.0;
            }
            beta[node] * state.infectious(node) as f64 / pop as f64
        })
        .collect();

    // Mix hazards along commuting flows, then draw exposures
    let mut exposures = vec![0; nnodes];
    for node in 0..nnodes {
        let away = (alpha * commuting.away[node]).min(1.0);
        let mut foi = (1.0 - away) * lambda[node];
        if away > 0.0 {
            for (dest, &fraction) in commuting.fractions[node].iter().enumerate() {
                foi += alpha * fraction * lambda[dest];
            }
        }

        let susceptible = state.count(node, Compartment::Susceptible);
        let p = transition_probability(foi, dt);
        let new_exposures = draw_binomial(susceptible, p, rng);
        if new_exposures > 0 {
            state.sub(node, Compartment::Susceptible, new_exposures);
            state.add(node, Compartment::Exposed, new_exposures);
            exposures[node] = new_exposures;
        }
    }

    exposures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography::Geography;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn geography() -> Geography {
        Geography::from_parts(
            vec!["a".to_string(), "b".to_string()],
            vec![1000, 1000],
            vec![vec![0.0, 100.0], vec![0.0, 0.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_no_infectious_no_exposures() {
        let geo = geography();
        let mut state = CompartmentGrid::from_populations(geo.populations());
        let mut rng = StdRng::seed_from_u64(5);
        let exposures = transmission_system(
            &mut state,
            &[0.6, 0.6],
            1.0,
            &geo.commuting(),
            geo.populations(),
            1.0 / 6.0,
            &mut rng,
        );
        assert_eq!(exposures.iter().sum::<u64>(), 0);
        assert_eq!(state.count(0, Compartment::Exposed), 0);
    }

    #[test]
    fn test_local_outbreak_exposes_locally() {
        let geo = geography();
        let mut state = CompartmentGrid::from_populations(geo.populations());
        state.sub(1, Compartment::Susceptible, 200);
        state.add(1, Compartment::Infectious1, 200);

        let mut rng = StdRng::seed_from_u64(5);
        let exposures = transmission_system(
            &mut state,
            &[2.0, 2.0],
            1.0,
            &geo.commuting(),
            geo.populations(),
            1.0,
            &mut rng,
        );
        assert!(exposures[1] > 0);
        assert_eq!(state.living(1), 1000);
    }

    #[test]
    fn test_commuting_carries_infection_across_nodes() {
        let geo = geography();
        let mut state = CompartmentGrid::from_populations(geo.populations());
        // Outbreak only at node b; node a residents commute to b
        state.sub(1, Compartment::Susceptible, 500);
        state.add(1, Compartment::Infectious2, 500);

        let mut rng = StdRng::seed_from_u64(5);
        let exposures = transmission_system(
            &mut state,
            &[3.0, 3.0],
            1.0,
            &geo.commuting(),
            geo.populations(),
            1.0,
            &mut rng,
        );
        assert!(exposures[0] > 0, "commuters to b should be exposed");
    }

    #[test]
    fn test_alpha_zero_isolates_nodes() {
        let geo = geography();
        let mut state = CompartmentGrid::from_populations(geo.populations());
        state.sub(1, Compartment::Susceptible, 500);
        state.add(1, Compartment::Infectious1, 500);

        let mut rng = StdRng::seed_from_u64(5);
        let exposures = transmission_system(
            &mut state,
            &[3.0, 3.0],
            0.0,
            &geo.commuting(),
            geo.populations(),
            1.0,
            &mut rng,
        );
        assert_eq!(exposures[0], 0, "no commuting time, no cross-node exposure");
    }
}
