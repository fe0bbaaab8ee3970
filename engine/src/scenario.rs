//! Scenario assembly
//!
//! Resolves a validated configuration against the filesystem: loads the
//! geography, the seeding inputs and the acceptance filter, and fixes the
//! intervention scenario for the run. The result is everything a
//! realization needs, shared read-only across the ensemble.

use std::path::{Path, PathBuf};

use crate::compartments::TimeGrid;
use crate::config::{InterventionsConfig, ParametersConfig, ScenarioConfig};
use crate::error::Result;
use crate::filter::AcceptanceFilter;
use crate::geography::{Commuting, Geography};
use crate::outcomes::OutcomesConfig;
use crate::seeding::SeedingPlan;

/// A fully-resolved planning scenario, ready to run
pub struct Scenario {
    pub name: String,
    pub npi_scenario: Option<String>,
    pub grid: TimeGrid,
    pub geography: Geography,
    pub commuting: Commuting,
    pub parameters: ParametersConfig,
    pub interventions: InterventionsConfig,
    pub seeding: SeedingPlan,
    pub filter: AcceptanceFilter,
    pub outcomes: Option<OutcomesConfig>,
    pub nsimulations: usize,
    pub base_seed: u64,
}

impl Scenario {
    /// Build from a validated config. Relative input paths are resolved
    /// against `base_dir` (usually the config file's directory).
    pub fn from_config(
        config: ScenarioConfig,
        npi_scenario: Option<String>,
        base_dir: &Path,
    ) -> Result<Self> {
        let grid = TimeGrid::new(config.start_date, config.end_date, config.dt)?;

        let geography = Geography::load(
            &resolve(base_dir, &config.spatial_setup.geodata),
            &resolve(base_dir, &config.spatial_setup.mobility),
            &config.spatial_setup.nodenames,
            &config.spatial_setup.popnodes,
        )?;
        let commuting = geography.commuting();

        let seeding = {
            let rebased = rebase_seeding(&config.seeding, base_dir);
            SeedingPlan::resolve(&rebased, &geography)?
        };

        let filter = match &config.filter_file {
            Some(path) => AcceptanceFilter::load(
                &resolve(base_dir, path),
                grid.ndays(),
                geography.nnodes(),
            )?,
            None => AcceptanceFilter::unconstrained(grid.ndays(), geography.nnodes()),
        };

        // Fail on a bad scenario name now, not inside the ensemble
        if let Some(scenario) = &npi_scenario {
            crate::npi::validate_scenario(scenario, &config.interventions, &geography)?;
        }

        Ok(Self {
            name: config.name,
            npi_scenario,
            grid,
            geography,
            commuting,
            parameters: config.seir.parameters,
            interventions: config.interventions,
            seeding,
            filter,
            outcomes: config.outcomes,
            nsimulations: config.nsimulations,
            base_seed: config.seed,
        })
    }

    pub fn nnodes(&self) -> usize {
        self.geography.nnodes()
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn rebase_seeding(
    seeding: &crate::config::SeedingConfig,
    base: &Path,
) -> crate::config::SeedingConfig {
    use crate::config::SeedingConfig;
    match seeding {
        SeedingConfig::None => SeedingConfig::None,
        SeedingConfig::PoissonDistributed { lambda_file } => SeedingConfig::PoissonDistributed {
            lambda_file: resolve(base, lambda_file),
        },
        SeedingConfig::FolderDraw { folder_path } => SeedingConfig::FolderDraw {
            folder_path: resolve(base, folder_path),
        },
    }
}
