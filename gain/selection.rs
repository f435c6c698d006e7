//! # Selection Gain
//!
//! Given a predictor (`predicted`) and the quantity it tries to predict (`measured`) for
//! the `n` members of one group, the selection gain is the expected measured value of the
//! best-predicted member of a uniformly random `k`-subset, minus the expected measured
//! value of a uniformly random member. It is positive when the predictor helps, zero when
//! it carries no information and negative when it is anti-correlated with the truth.
//!
//! Four estimators compute the same quantity:
//!
//! - [`GainMethod::Brute`]: averages over every ordered pair. Only defined for `k = 2`.
//! - [`GainMethod::Naive`]: binomial weights `C(i-1, k-1) / C(n, k)` evaluated directly.
//! - [`GainMethod::ClosedForm`]: the same weights as a running product, no binomials.
//! - [`GainMethod::Fast`]: a dot product with [`hockey_stick_pmf`]. This is the one to use.
//!
//! The first three are kept as oracles for the fourth.
//!
//! ## Rank order
//!
//! All estimators rank items by predicted value, compared with `f64::total_cmp`. Items
//! with equal predictions form a tie block, and a selection that lands on a tie picks one
//! of its members uniformly at random. The weighted estimators therefore give each member
//! of a block the block's average rank weight, and the pairwise estimator scores a tied
//! pair as zero. Row order never affects the result, and a constant predictor has no gain.

use crate::hockey::{binomial, hockey_stick_pmf};
use crate::stats::{compensated_sum, mean};
use crate::types::{SelectionError, check_paired, check_selection};
use itertools::Itertools;
use ndarray::{Array1, ArrayView1, Axis, s};
use std::cmp::Ordering;

/// Algorithm used by [`selection_gain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainMethod {
    Brute,
    Naive,
    ClosedForm,
    Fast,
}

impl GainMethod {
    pub const ALL: [GainMethod; 4] = [
        GainMethod::Brute,
        GainMethod::Naive,
        GainMethod::ClosedForm,
        GainMethod::Fast,
    ];

    /// Whether the method can evaluate selection among `k`.
    pub fn supports(self, k: usize) -> bool {
        !matches!(self, GainMethod::Brute) || k == 2
    }
}

/// Expected gain of picking the best-predicted member of a random `k`-subset.
pub fn selection_gain(
    method: GainMethod,
    k: usize,
    predicted: ArrayView1<f64>,
    measured: ArrayView1<f64>,
) -> Result<f64, SelectionError> {
    match method {
        GainMethod::Brute => gain_brute(k, predicted, measured),
        GainMethod::Naive => gain_naive(k, predicted, measured),
        GainMethod::ClosedForm => gain_closed_form(k, predicted, measured),
        GainMethod::Fast => gain_fast(k, predicted, measured),
    }
}

/// Indices of `predicted` in ascending order of prediction.
///
/// The sort is stable, so members of a tie block keep their input order. No estimator
/// depends on that order.
pub fn rank_order(predicted: ArrayView1<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..predicted.len()).collect();
    order.sort_by(|&a, &b| compare_prediction(predicted, a, b));
    order
}

#[inline]
fn compare_prediction(predicted: ArrayView1<f64>, a: usize, b: usize) -> Ordering {
    predicted[a].total_cmp(&predicted[b])
}

fn validate(
    k: usize,
    predicted: ArrayView1<f64>,
    measured: ArrayView1<f64>,
) -> Result<usize, SelectionError> {
    let n = check_paired(predicted.len(), measured.len())?;
    check_selection(n, k)?;
    Ok(n)
}

/// `measured` gathered into the rank order of `predicted`, with every tie block replaced
/// by its mean.
///
/// Weighting the block means by the rank weights equals giving each member the block's
/// average weight.
fn measured_by_rank(predicted: ArrayView1<f64>, measured: ArrayView1<f64>) -> Array1<f64> {
    let order = rank_order(predicted);
    let mut sorted = measured.select(Axis(0), &order);

    let mut start = 0;
    for (_, block) in &order
        .iter()
        .chunk_by(|&&idx| predicted[idx].to_bits())
    {
        let len = block.count();
        if len > 1 {
            let mut members = sorted.slice_mut(s![start..start + len]);
            let center = mean(members.iter().copied());
            members.fill(center);
        }
        start += len;
    }
    sorted
}

/// Pairwise enumeration. O(n²), `k = 2` only.
///
/// A tied pair contributes nothing: either member is picked with probability one half.
pub fn gain_brute(
    k: usize,
    predicted: ArrayView1<f64>,
    measured: ArrayView1<f64>,
) -> Result<f64, SelectionError> {
    if k != 2 {
        return Err(SelectionError::BruteRequiresPairs(k));
    }
    let n = validate(k, predicted, measured)?;

    let (subtotal, pairs) = (0..n)
        .cartesian_product(0..n)
        .filter(|(i, j)| i != j)
        .fold((0.0_f64, 0usize), |(subtotal, pairs), (i, j)| {
            let half_difference = match compare_prediction(predicted, i, j) {
                Ordering::Less => (measured[j] - measured[i]) / 2.0,
                Ordering::Greater => (measured[i] - measured[j]) / 2.0,
                Ordering::Equal => 0.0,
            };
            (subtotal + half_difference, pairs + 1)
        });

    Ok(subtotal / pairs as f64)
}

/// Rank weights from directly evaluated binomial coefficients.
///
/// Loses precision, and eventually overflows, as `n` grows; reference use only.
pub fn gain_naive(
    k: usize,
    predicted: ArrayView1<f64>,
    measured: ArrayView1<f64>,
) -> Result<f64, SelectionError> {
    let n = validate(k, predicted, measured)?;
    let sorted = measured_by_rank(predicted, measured);

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(idx, &y)| y * binomial(idx, k - 1))
        .sum();
    let benefit = weighted / binomial(n, k);

    Ok(benefit - mean(measured.iter().copied()))
}

/// Rank weights as `k/n · Π_{j=1}^{k-1} (i - j)/(n - j)`. O(n·k).
pub fn gain_closed_form(
    k: usize,
    predicted: ArrayView1<f64>,
    measured: ArrayView1<f64>,
) -> Result<f64, SelectionError> {
    let n = validate(k, predicted, measured)?;
    let sorted = measured_by_rank(predicted, measured);

    let benefit: f64 = sorted
        .iter()
        .enumerate()
        .map(|(idx, &y)| {
            let rank = (idx + 1) as f64;
            let weight = (1..k).fold(k as f64 / n as f64, |weight, j| {
                weight * (rank - j as f64) / (n - j) as f64
            });
            y * weight
        })
        .sum();

    Ok(benefit - mean(measured.iter().copied()))
}

/// Hockey-stick dot product. O(n log n).
pub fn gain_fast(
    k: usize,
    predicted: ArrayView1<f64>,
    measured: ArrayView1<f64>,
) -> Result<f64, SelectionError> {
    let n = validate(k, predicted, measured)?;
    let pmf = hockey_stick_pmf(n, k)?;
    let sorted = measured_by_rank(predicted, measured);

    let benefit = compensated_sum(pmf.iter().zip(sorted.iter()).map(|(&p, &y)| p * y));
    Ok(benefit - mean(measured.iter().copied()))
}
