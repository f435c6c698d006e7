//! # The Hockey-Stick Rank Distribution
//!
//! Draw a uniformly random `k`-subset from `n` ranked items and keep its highest-ranked
//! member. The probability that the kept item has rank `i` (1-based, ascending) is
//!
//! ```text
//! P(i) = C(i - 1, k - 1) / C(n, k)
//! ```
//!
//! which is zero below rank `k` and then rises steeply towards the top rank, giving the
//! distribution its shape. Selection-gain estimation is a dot product of this vector with
//! the measured values sorted by predicted rank.
//!
//! The binomial form overflows long before the groups of interest get large, so the
//! production path walks down from the top rank with the ratio
//! `P(i) = P(i + 1) * (i - (k - 1)) / i`, starting at `P(n) = k / n`. Every intermediate
//! value is itself a probability.

use crate::types::{PmfVariant, SelectionError, check_selection};
use ndarray::Array1;

/// Rank distribution of the winner of a random `k`-subset of `n` items.
///
/// Entry `i - 1` holds the probability for rank `i`. Requires `n >= k >= 1`.
pub fn hockey_stick_pmf(n: usize, k: usize) -> Result<Array1<f64>, SelectionError> {
    hockey_stick_pmf_with(n, k, PmfVariant::Recursive)
}

/// Same as [`hockey_stick_pmf`], with an explicit choice of algorithm.
///
/// [`PmfVariant::DirectBinomial`] exists so tests can check the recursion against the
/// textbook formula; it produces non-finite entries once `C(n, k)` overflows.
pub fn hockey_stick_pmf_with(
    n: usize,
    k: usize,
    variant: PmfVariant,
) -> Result<Array1<f64>, SelectionError> {
    check_selection(n, k)?;
    let pmf = match variant {
        PmfVariant::Recursive => recursive_pmf(n, k),
        PmfVariant::DirectBinomial => direct_binomial_pmf(n, k),
    };
    Ok(pmf)
}

fn recursive_pmf(n: usize, k: usize) -> Array1<f64> {
    let mut pmf = Array1::zeros(n);
    pmf[n - 1] = k as f64 / n as f64;

    // Ranks below k cannot win any k-subset and keep their zero.
    for rank in (k..n).rev() {
        let ratio = (rank + 1 - k) as f64 / rank as f64;
        pmf[rank - 1] = pmf[rank] * ratio;
    }
    pmf
}

fn direct_binomial_pmf(n: usize, k: usize) -> Array1<f64> {
    let subsets = binomial(n, k);
    Array1::from_iter((1..=n).map(|rank| binomial(rank - 1, k - 1) / subsets))
}

/// Binomial coefficient `C(n, k)` evaluated in floating point.
///
/// Uses the multiplicative form, so it is exact for small arguments and becomes
/// `f64::INFINITY` once the true value exceeds the f64 range. Returns 0 for `k > n`.
pub fn binomial(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    (1..=k).fold(1.0_f64, |acc, j| acc * (n - k + j) as f64 / j as f64)
}
