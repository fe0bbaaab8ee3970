//! Scenario configuration
//!
//! One YAML file describes a planning run: the spatial inputs, the time
//! span, the disease parameters, the intervention catalog, and seeding.
//! Everything is validated up front so a bad file fails before any
//! simulation starts.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::distributions::{Expression, ValueDistribution};
use crate::error::{EngineError, Result};
use crate::outcomes::OutcomesConfig;

/// Root scenario configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Setup name; output lands under `model_output/<name>/`
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Step size in days
    #[serde(default = "default_dt")]
    pub dt: f64,
    pub nsimulations: usize,
    /// Base seed for the ensemble
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub spatial_setup: SpatialSetupConfig,
    #[serde(default)]
    pub seeding: SeedingConfig,
    pub seir: SeirConfig,
    #[serde(default)]
    pub interventions: InterventionsConfig,
    /// Optional acceptance filter matrix (days x nodes, -1 = unconstrained)
    #[serde(default)]
    pub filter_file: Option<PathBuf>,
    #[serde(default)]
    pub outcomes: Option<OutcomesConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialSetupConfig {
    pub geodata: PathBuf,
    pub mobility: PathBuf,
    /// Geodata column holding node names
    #[serde(default = "default_nodenames_key")]
    pub nodenames: String,
    /// Geodata column holding node populations
    #[serde(default = "default_popnodes_key")]
    pub popnodes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeirConfig {
    pub parameters: ParametersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametersConfig {
    /// Fraction of the day residents spend at their travel destination
    #[serde(default = "default_alpha")]
    pub alpha: Expression,
    /// Incubation exit rate (E -> I1)
    pub sigma: Expression,
    /// Stage exit rate distribution; the draw is scaled by the number of
    /// infectious stages
    pub gamma: ValueDistribution,
    #[serde(rename = "R0s")]
    pub r0s: ValueDistribution,
}

/// How exogenous infections enter the simulation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SeedingConfig {
    /// No importation
    #[default]
    None,
    /// CSV of (place, date, amount); each row seeds Poisson(amount)
    /// infections
    PoissonDistributed { lambda_file: PathBuf },
    /// Folder of importation_{n}.csv files; realization uid picks the file
    FolderDraw { folder_path: PathBuf },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterventionsConfig {
    /// Named intervention settings
    #[serde(default)]
    pub settings: BTreeMap<String, InterventionSpec>,
    /// Named scenarios: ordered lists of setting names
    #[serde(default)]
    pub scenarios: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionSpec {
    #[serde(default)]
    pub template: InterventionTemplate,
    /// Node names the intervention applies to; absent means all nodes
    #[serde(default)]
    pub affected_nodes: Option<Vec<String>>,
    pub period_start_date: NaiveDate,
    pub period_end_date: NaiveDate,
    /// Transmission reduction in [0, 1], possibly drawn per realization
    pub value: ValueDistribution,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterventionTemplate {
    #[default]
    Reduce,
}

fn default_dt() -> f64 {
    1.0 / 6.0
}

fn default_seed() -> u64 {
    42
}

fn default_nodenames_key() -> String {
    "geoid".to_string()
}

fn default_popnodes_key() -> String {
    "population".to_string()
}

fn default_alpha() -> Expression {
    Expression::new(1.0)
}

impl ScenarioConfig {
    pub fn load(path: &std::path::Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| EngineError::Config(format!("cannot open {}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EngineError::Config("name must not be empty".to_string()));
        }
        if self.end_date <= self.start_date {
            return Err(EngineError::Config(format!(
                "end_date ({}) must be after start_date ({})",
                self.end_date, self.start_date
            )));
        }
        if self.nsimulations == 0 {
            return Err(EngineError::Config(
                "nsimulations must be greater than 0".to_string(),
            ));
        }

        let p = &self.seir.parameters;
        if p.alpha.value() < 0.0 || p.alpha.value() > 1.0 {
            return Err(EngineError::Config(format!(
                "alpha must be between 0 and 1, got {}",
                p.alpha.value()
            )));
        }
        if p.sigma.value() <= 0.0 {
            return Err(EngineError::Config(format!(
                "sigma must be positive, got {}",
                p.sigma.value()
            )));
        }
        p.gamma.validate("gamma")?;
        p.r0s.validate("R0s")?;

        for (name, spec) in &self.interventions.settings {
            if spec.period_end_date < spec.period_start_date {
                return Err(EngineError::Config(format!(
                    "intervention '{name}': period_end_date precedes period_start_date"
                )));
            }
            spec.value.validate(name)?;
            if let Some(nodes) = &spec.affected_nodes {
                if nodes.is_empty() {
                    return Err(EngineError::Config(format!(
                        "intervention '{name}': affected_nodes is present but empty"
                    )));
                }
            }
        }
        for (scenario, settings) in &self.interventions.scenarios {
            for setting in settings {
                if !self.interventions.settings.contains_key(setting) {
                    return Err(EngineError::Config(format!(
                        "scenario '{scenario}' references unknown intervention '{setting}'"
                    )));
                }
            }
        }

        if let Some(outcomes) = &self.outcomes {
            outcomes.validate()?;
        }

        Ok(())
    }
}
