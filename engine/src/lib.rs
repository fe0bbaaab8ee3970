//! EpiPlan Simulation Engine
//!
//! Stochastic spatial SEIR engine for scenario planning: Monte Carlo
//! ensembles of epidemic trajectories under intervention scenarios,
//! over a set of jurisdictions coupled by travel.

pub mod compartments;
pub mod config;
pub mod distributions;
pub mod error;
pub mod filter;
pub mod geography;
pub mod npi;
pub mod outcomes;
pub mod output;
pub mod parameters;
pub mod runner;
pub mod scenario;
pub mod seeding;
pub mod systems;
pub mod world;

pub use compartments::{Compartment, CompartmentGrid, TimeGrid, NCOMP, N_INFECT_STAGES};
pub use config::ScenarioConfig;
pub use error::{EngineError, Result};
pub use runner::{run_ensemble, EnsembleResult, Realization};
pub use scenario::Scenario;
pub use world::{SimulationWorld, Trajectory};
