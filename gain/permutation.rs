//! Variance of a dot product under a random permutation of one side.
//!
//! Under the null hypothesis that the predictor carries no information, the order in
//! which a family's measured values meet the hockey-stick weights is a uniformly random
//! permutation. The spread of the gain statistic is then the spread of `u · π(v)`, with
//! `u` the rank weights and `v` the measured values.
//!
//! Permutation moment identities give the variance in closed form:
//!
//! ```text
//! Var[u · π(v)] = Σ(u - ū)² · Σ(v - v̄)² / (n - 1)
//! ```
//!
//! The simulated estimator shuffles `v` repeatedly and exists to validate that identity.

use crate::stats::{Moments, compensated_sum, mean};
use crate::types::{SelectionError, check_paired, check_trials};
use ndarray::ArrayView1;
use rand::Rng;
use rand::seq::SliceRandom;

/// How [`permuted_dot_variance`] evaluates the variance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermutationVarianceMethod {
    Exact,
    Simulated { trials: usize },
}

pub fn permuted_dot_variance<R>(
    method: PermutationVarianceMethod,
    u: ArrayView1<f64>,
    v: ArrayView1<f64>,
    rng: &mut R,
) -> Result<f64, SelectionError>
where
    R: Rng + ?Sized,
{
    match method {
        PermutationVarianceMethod::Exact => exact_permuted_dot_variance(u, v),
        PermutationVarianceMethod::Simulated { trials } => {
            simulated_permuted_dot_variance(u, v, trials, rng)
        }
    }
}

/// Closed-form variance of `u · π(v)` over uniformly random permutations `π`.
///
/// A single element has only one permutation and therefore zero variance.
pub fn exact_permuted_dot_variance(
    u: ArrayView1<f64>,
    v: ArrayView1<f64>,
) -> Result<f64, SelectionError> {
    let n = check_paired(u.len(), v.len())?;
    if n == 1 {
        return Ok(0.0);
    }
    Ok(centered_sum_of_squares(u) * centered_sum_of_squares(v) / (n - 1) as f64)
}

/// Sample variance (ddof = 1) of `u · π(v)` over `trials` independent shuffles.
pub fn simulated_permuted_dot_variance<R>(
    u: ArrayView1<f64>,
    v: ArrayView1<f64>,
    trials: usize,
    rng: &mut R,
) -> Result<f64, SelectionError>
where
    R: Rng + ?Sized,
{
    check_paired(u.len(), v.len())?;
    check_trials(trials)?;

    let mut shuffled = v.to_vec();
    let mut moments = Moments::default();
    for _ in 0..trials {
        shuffled.shuffle(rng);
        let dot: f64 = u.iter().zip(shuffled.iter()).map(|(&a, &b)| a * b).sum();
        moments.push(dot);
    }
    Ok(moments.sample_variance())
}

fn centered_sum_of_squares(values: ArrayView1<f64>) -> f64 {
    let center = mean(values.iter().copied());
    compensated_sum(values.iter().map(|&x| (x - center) * (x - center)))
}
