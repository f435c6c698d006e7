//! Analysis configuration.
//!
//! Everything that changes what an analysis run computes is carried in
//! [`AnalysisConfig`] and passed explicitly to the aggregation entry point. The struct
//! round-trips through a human-readable TOML file so a run can be reproduced from the
//! file alone.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_SELECTION_SIZE: usize = 2;
const DEFAULT_TRIALS: usize = 10_000;

/// Affine map between standard-deviation units and a physical unit of the trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhenotypeScale {
    pub mean: f64,
    pub sd: f64,
}

impl PhenotypeScale {
    /// Adult height in centimetres.
    pub const HEIGHT_CM: PhenotypeScale = PhenotypeScale {
        mean: 173.0,
        sd: 5.6,
    };

    /// A physical value expressed as a z-score.
    #[inline]
    pub fn standardize(&self, value: f64) -> f64 {
        (value - self.mean) / self.sd
    }

    /// A difference of physical values (such as a gain) in standard deviations.
    #[inline]
    pub fn difference_in_sd(&self, difference: f64) -> f64 {
        difference / self.sd
    }
}

/// Inputs of one family-level selection analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Delimited table with `FID`, `IID`, `predicted` and `measured` columns.
    pub data_source: PathBuf,
    /// Size `k` of the random subset the best-predicted member is chosen from.
    #[serde(default = "default_selection_size")]
    pub selection_size: usize,
    /// Replace predicted values with measured values. Gives the upper bound a perfect
    /// predictor would reach; never a real result.
    #[serde(default)]
    pub oracle_mode: bool,
    /// Shuffles per family for the simulated null variance.
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Also estimate the null variance by simulation.
    #[serde(default)]
    pub simulate_null: bool,
    /// Seed for every Monte Carlo step; entropy-seeded when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Keep only individuals whose `IID` is below this value.
    #[serde(default)]
    pub child_id_threshold: Option<i64>,
    /// Report gains in standard deviations of this scale instead of raw units.
    #[serde(default)]
    pub phenotype_scale: Option<PhenotypeScale>,
}

fn default_selection_size() -> usize {
    DEFAULT_SELECTION_SIZE
}

fn default_trials() -> usize {
    DEFAULT_TRIALS
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("selection_size must be at least 1 (got {0}).")]
    InvalidSelectionSize(usize),
    #[error("trials must be at least 2 when simulate_null is enabled (got {0}).")]
    TooFewTrials(usize),
    #[error("phenotype_scale.sd must be positive and finite (got {0}).")]
    InvalidPhenotypeSd(f64),
}

impl AnalysisConfig {
    /// A configuration with every option at its default.
    pub fn new(data_source: impl Into<PathBuf>) -> Self {
        Self {
            data_source: data_source.into(),
            selection_size: DEFAULT_SELECTION_SIZE,
            oracle_mode: false,
            trials: DEFAULT_TRIALS,
            simulate_null: false,
            random_seed: None,
            child_id_threshold: None,
            phenotype_scale: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selection_size == 0 {
            return Err(ConfigError::InvalidSelectionSize(self.selection_size));
        }
        if self.simulate_null && self.trials < 2 {
            return Err(ConfigError::TooFewTrials(self.trials));
        }
        if let Some(scale) = &self.phenotype_scale {
            if !(scale.sd.is_finite() && scale.sd > 0.0) {
                return Err(ConfigError::InvalidPhenotypeSd(scale.sd));
            }
        }
        Ok(())
    }

    /// Random number generator for the Monte Carlo steps of this run.
    pub fn rng(&self) -> StdRng {
        match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Saves the configuration in TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads and validates a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&toml_string)?;
        config.validate()?;
        Ok(config)
    }
}
