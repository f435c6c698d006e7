//! Numerically careful accumulation helpers.
//!
//! Per-family gains are averaged with equal weight, and Monte Carlo estimators reduce
//! tens of thousands of draws to a mean and a variance. Both are done here with
//! compensated summation and Welford's update so that the result does not depend on
//! how many terms are being combined.

/// Neumaier-compensated sum.
pub fn compensated_sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for value in values {
        let t = sum + value;
        if sum.abs() >= value.abs() {
            compensation += (sum - t) + value;
        } else {
            compensation += (value - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

/// Arithmetic mean. Returns NaN for an empty input.
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut count = 0usize;
    let total = compensated_sum(values.into_iter().inspect(|_| count += 1));
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}

/// Streaming first and second moments (Welford).
#[derive(Debug, Clone, Copy, Default)]
pub struct Moments {
    count: usize,
    mean: f64,
    m2: f64,
}

impl Moments {
    #[inline]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { f64::NAN } else { self.mean }
    }

    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            f64::NAN
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn compensated_sum_recovers_small_terms_next_to_large_ones() {
        let values = [1e16, 1.0, -1e16, 1.0];
        assert_eq!(compensated_sum(values), 2.0);
        // Naive left-to-right accumulation loses the first unit entirely.
        assert_ne!(values.iter().sum::<f64>(), 2.0);
    }

    #[test]
    fn mean_of_empty_input_is_nan() {
        assert!(mean(std::iter::empty()).is_nan());
        assert_abs_diff_eq!(mean([1.0, 2.0, 6.0]), 3.0, epsilon = 1e-15);
    }

    fn moments_of<const N: usize>(values: [f64; N]) -> Moments {
        let mut moments = Moments::default();
        values.into_iter().for_each(|value| moments.push(value));
        moments
    }

    #[test]
    fn sample_variance_uses_one_degree_of_freedom() {
        // Deviations from the mean of 5 are -3, -1, 1, 3: squared sum 20, over n - 1 = 3.
        assert_abs_diff_eq!(
            moments_of([2.0, 4.0, 6.0, 8.0]).sample_variance(),
            20.0 / 3.0,
            epsilon = 1e-12
        );
        assert!(moments_of([4.0]).sample_variance().is_nan());
    }

    #[test]
    fn moments_of_identical_values_have_exactly_zero_variance() {
        let mut moments = Moments::default();
        for _ in 0..1000 {
            moments.push(0.1);
        }
        assert_eq!(moments.sample_variance(), 0.0);
        assert_abs_diff_eq!(moments.mean(), 0.1, epsilon = 1e-15);
    }

    #[test]
    fn welford_is_stable_under_a_large_offset() {
        let offset = 1e9;
        let values = [offset + 4.0, offset + 7.0, offset + 13.0, offset + 16.0];
        assert_abs_diff_eq!(moments_of(values).sample_variance(), 30.0, epsilon = 1e-6);
    }
}
