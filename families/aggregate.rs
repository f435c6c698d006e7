//! # Family-Level Aggregation
//!
//! Turns grouped families into the two numbers an analysis reports: the average selection
//! gain across families, and the variance that average would have if the predictor carried
//! no information.
//!
//! Families are weighted equally. A family too small to supply a subset of size `k` is
//! skipped and counted; it never contributes a zero.

use super::data::{DataError, Family, eligible_families, load_family_table};
use crate::config::{AnalysisConfig, ConfigError, PhenotypeScale};
use crate::hockey::hockey_stick_pmf;
use crate::permutation::{PermutationVarianceMethod, permuted_dot_variance};
use crate::selection::gain_fast;
use crate::stats::compensated_sum;
use crate::types::SelectionError;
use log::{info, warn};
use ndarray::Array1;
use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Failed to load the family table: {0}")]
    Data(#[from] DataError),
    #[error("Invalid analysis configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Estimator precondition failed: {0}")]
    Selection(#[from] SelectionError),
    #[error(
        "None of the {total} families has at least {k} members, so no selection among {k} can be evaluated."
    )]
    NoEligibleFamilies { k: usize, total: usize },
}

/// Average selection gain across families.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainSummary {
    pub selection_size: usize,
    pub families_used: usize,
    pub families_skipped: usize,
    /// Mean gain in the unit of the measured column.
    pub mean_gain: f64,
    /// Mean gain in phenotypic standard deviations, when a scale was given.
    pub mean_gain_in_sd: Option<f64>,
}

impl GainSummary {
    /// The gain in the unit the analysis reports: standard deviations when scaled.
    pub fn reported_gain(&self) -> f64 {
        self.mean_gain_in_sd.unwrap_or(self.mean_gain)
    }
}

/// Null-hypothesis variance of the average gain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullVarianceSummary {
    /// In the squared reporting unit of [`GainSummary::reported_gain`].
    pub variance: f64,
    pub standard_deviation: f64,
}

impl NullVarianceSummary {
    fn from_variance(variance: f64) -> Self {
        Self {
            variance,
            standard_deviation: variance.sqrt(),
        }
    }
}

/// Everything [`run_analysis`] computes.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub families_total: usize,
    pub gain: GainSummary,
    pub null_exact: NullVarianceSummary,
    pub null_simulated: Option<NullVarianceSummary>,
}

impl AnalysisReport {
    /// Reported gain divided by its null standard deviation; `None` when the null has no spread.
    pub fn z_score(&self) -> Option<f64> {
        let sd = self.null_exact.standard_deviation;
        (sd > 0.0).then(|| self.gain.reported_gain() / sd)
    }
}

/// Unweighted mean of the fast gain over every family with at least `k` members.
pub fn average_gain(
    families: &[Family],
    k: usize,
    scale: Option<&PhenotypeScale>,
) -> Result<GainSummary, AggregateError> {
    let eligible = eligible_families(families, k);
    if eligible.is_empty() {
        return Err(AggregateError::NoEligibleFamilies {
            k,
            total: families.len(),
        });
    }
    let skipped = families.len() - eligible.len();
    if skipped > 0 {
        warn!(
            "{} of {} families have fewer than {} members and were skipped.",
            skipped,
            families.len(),
            k
        );
    }

    let gains = eligible
        .iter()
        .map(|family| gain_fast(k, family.predicted.view(), family.measured.view()))
        .collect::<Result<Vec<f64>, SelectionError>>()?;
    let mean_gain = compensated_sum(gains.iter().copied()) / gains.len() as f64;

    Ok(GainSummary {
        selection_size: k,
        families_used: eligible.len(),
        families_skipped: skipped,
        mean_gain,
        mean_gain_in_sd: scale.map(|s| s.difference_in_sd(mean_gain)),
    })
}

/// Variance of the average gain when each family's measured values meet the rank
/// weights in a uniformly random order.
///
/// The families are independent, so the variance of their mean is `Σ_f Var_f / F²`.
/// With a scale, measured values are standardized first and the result is in SD².
pub fn null_gain_variance<R>(
    families: &[Family],
    k: usize,
    scale: Option<&PhenotypeScale>,
    method: PermutationVarianceMethod,
    rng: &mut R,
) -> Result<NullVarianceSummary, AggregateError>
where
    R: Rng + ?Sized,
{
    let eligible = eligible_families(families, k);
    if eligible.is_empty() {
        return Err(AggregateError::NoEligibleFamilies {
            k,
            total: families.len(),
        });
    }

    let mut per_family = Vec::with_capacity(eligible.len());
    for family in &eligible {
        let weights = hockey_stick_pmf(family.len(), k)?;
        let measured: Array1<f64> = match scale {
            Some(s) => family.measured.mapv(|y| s.standardize(y)),
            None => family.measured.clone(),
        };
        per_family.push(permuted_dot_variance(
            method,
            weights.view(),
            measured.view(),
            rng,
        )?);
    }

    let count = eligible.len() as f64;
    let variance = compensated_sum(per_family) / (count * count);
    Ok(NullVarianceSummary::from_variance(variance))
}

/// Loads the configured table and computes the gain and its null spread.
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisReport, AggregateError> {
    config.validate()?;

    let mut table = load_family_table(&config.data_source)?;
    if config.oracle_mode {
        warn!("Oracle mode: predictions replaced by measured values. This is an upper bound, not a result.");
        table = table.with_oracle_predictions();
    }

    let families = table.families(config.child_id_threshold);
    info!(
        "Evaluating selection among {} across {} families.",
        config.selection_size,
        families.len()
    );

    let k = config.selection_size;
    let scale = config.phenotype_scale.as_ref();
    let mut rng = config.rng();

    let gain = average_gain(&families, k, scale)?;
    let null_exact = null_gain_variance(
        &families,
        k,
        scale,
        PermutationVarianceMethod::Exact,
        &mut rng,
    )?;
    let null_simulated = if config.simulate_null {
        info!("Simulating the null with {} shuffles per family.", config.trials);
        Some(null_gain_variance(
            &families,
            k,
            scale,
            PermutationVarianceMethod::Simulated {
                trials: config.trials,
            },
            &mut rng,
        )?)
    } else {
        None
    };

    Ok(AnalysisReport {
        families_total: families.len(),
        gain,
        null_exact,
        null_simulated,
    })
}
