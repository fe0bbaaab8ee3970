//! Simulation systems - advance compartment counts each step

pub mod progression;
pub mod transmission;

pub use progression::progression_system;
pub use transmission::transmission_system;

use rand::Rng;
use rand_distr::{Binomial, Distribution};

/// Binomial transition draw. `p` is clamped into [0, 1] so accumulated
/// floating error in a rate can never poison the distribution.
pub(crate) fn draw_binomial<R: Rng + ?Sized>(n: u64, p: f64, rng: &mut R) -> u64 {
    if n == 0 || p <= 0.0 {
        return 0;
    }
    if p >= 1.0 {
        return n;
    }
    match Binomial::new(n, p) {
        Ok(distr) => distr.sample(rng),
        Err(_) => 0,
    }
}

/// Probability of leaving a compartment within `dt` days at `rate` per day
pub(crate) fn transition_probability(rate: f64, dt: f64) -> f64 {
    1.0 - (-rate * dt).exp()
}
