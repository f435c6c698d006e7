use ndarray::{Array1, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use selgain::hockey::hockey_stick_pmf;
use selgain::selection::{GainMethod, gain_closed_form, gain_fast, selection_gain};

fn normal_vector(rng: &mut StdRng, n: usize) -> Array1<f64> {
    Array1::from_iter((0..n).map(|_| -> f64 { StandardNormal.sample(rng) }))
}

fn assert_methods_agree(k: usize, predicted: &Array1<f64>, measured: &Array1<f64>) {
    let fast = gain_fast(k, predicted.view(), measured.view()).unwrap();
    for method in GainMethod::ALL {
        if !method.supports(k) {
            continue;
        }
        let gain = selection_gain(method, k, predicted.view(), measured.view()).unwrap();
        assert!(
            (gain - fast).abs() < 1e-9,
            "{method:?} gave {gain}, fast gave {fast} (k = {k}, x = {predicted}, y = {measured})"
        );
    }
}

#[test]
fn all_methods_agree_on_random_small_groups() {
    let mut rng = StdRng::seed_from_u64(0xA11CE);
    for _ in 0..200 {
        let n = rng.gen_range(1..=8);
        let predicted = normal_vector(&mut rng, n);
        let measured = normal_vector(&mut rng, n).mapv(|y| 170.0 + 6.0 * y);
        for k in 1..=n {
            assert_methods_agree(k, &predicted, &measured);
        }
    }
}

#[test]
fn all_methods_agree_when_predictions_are_heavily_tied() {
    let mut rng = StdRng::seed_from_u64(0x71E5);
    for _ in 0..200 {
        let n = rng.gen_range(2..=8);
        let predicted = Array1::from_iter((0..n).map(|_| rng.gen_range(0..3) as f64));
        let measured = normal_vector(&mut rng, n);
        for k in 1..=n {
            assert_methods_agree(k, &predicted, &measured);
        }
    }
}

#[test]
fn constant_predictor_gains_nothing_whatever_the_row_order() {
    for n in [10, 100, 1_000] {
        let predicted = Array1::from_elem(n, 0.5);
        let ascending = Array1::from_iter((0..n).map(|i| i as f64));
        let descending = Array1::from_iter((0..n).rev().map(|i| i as f64));
        for measured in [&ascending, &descending] {
            for method in GainMethod::ALL {
                let gain = selection_gain(method, 2, predicted.view(), measured.view()).unwrap();
                assert!(gain.abs() < 1e-9, "n = {n}: {method:?} gave {gain}");
            }
        }
    }
}

#[test]
fn shuffling_rows_leaves_the_gain_unchanged_under_ties() {
    let mut rng = StdRng::seed_from_u64(0x5EED);
    for _ in 0..100 {
        let n = rng.gen_range(2..=12);
        let predicted = Array1::from_iter((0..n).map(|_| rng.gen_range(0..3) as f64));
        let measured = normal_vector(&mut rng, n);
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);
        let shuffled_predicted = predicted.select(Axis(0), &order);
        let shuffled_measured = measured.select(Axis(0), &order);
        for k in 1..=n {
            let original = gain_fast(k, predicted.view(), measured.view()).unwrap();
            let shuffled =
                gain_fast(k, shuffled_predicted.view(), shuffled_measured.view()).unwrap();
            assert!(
                (original - shuffled).abs() < 1e-9,
                "k = {k}: {original} before shuffling, {shuffled} after"
            );
        }
    }
}

#[test]
fn fast_and_closed_form_agree_on_a_large_group() {
    let mut rng = StdRng::seed_from_u64(2_000);
    let predicted = normal_vector(&mut rng, 2_000);
    let measured = &predicted * 0.5 + normal_vector(&mut rng, 2_000);
    for k in [2, 5, 10] {
        let fast = gain_fast(k, predicted.view(), measured.view()).unwrap();
        let closed = gain_closed_form(k, predicted.view(), measured.view()).unwrap();
        assert!((fast - closed).abs() < 1e-9, "k = {k}: {fast} vs {closed}");
        assert!(fast > 0.0, "an informative predictor should gain (k = {k})");
    }
}

#[test]
fn larger_subsets_gain_more_from_an_informative_predictor() {
    let mut rng = StdRng::seed_from_u64(31);
    let predicted = normal_vector(&mut rng, 500);
    let measured = &predicted * 0.7 + normal_vector(&mut rng, 500) * 0.7;
    let gains: Vec<f64> = (1..=6)
        .map(|k| gain_fast(k, predicted.view(), measured.view()).unwrap())
        .collect();
    assert!(gains[0].abs() < 1e-12);
    for pair in gains.windows(2) {
        assert!(pair[1] > pair[0], "gains not increasing in k: {gains:?}");
    }
}

#[test]
fn zero_information_gain_shrinks_toward_zero_as_groups_grow() {
    let mut rng = StdRng::seed_from_u64(0xDEAD);
    let mean_abs_gain = |n: usize, rng: &mut StdRng| -> f64 {
        let reps = 200;
        let total: f64 = (0..reps)
            .map(|_| {
                let predicted = normal_vector(rng, n);
                let measured = normal_vector(rng, n);
                gain_fast(2, predicted.view(), measured.view())
                    .unwrap()
                    .abs()
            })
            .sum();
        total / reps as f64
    };

    let small = mean_abs_gain(10, &mut rng);
    let medium = mean_abs_gain(100, &mut rng);
    let large = mean_abs_gain(1_000, &mut rng);
    assert!(
        small > medium && medium > large,
        "mean |gain|: n=10 {small}, n=100 {medium}, n=1000 {large}"
    );
    assert!(large < 0.05, "n = 1000 mean |gain| {large}");
}

#[test]
fn fast_gain_is_the_pmf_weighted_sorted_mean_minus_the_mean() {
    let predicted = Array1::from(vec![0.9, -0.2, 0.4, 1.7, 0.0]);
    let measured = Array1::from(vec![2.0, 1.0, 4.0, 3.0, 5.0]);
    // Ascending order of predicted: indices 1, 4, 2, 0, 3.
    let sorted = [1.0, 5.0, 4.0, 2.0, 3.0];
    let pmf = hockey_stick_pmf(5, 3).unwrap();
    let expected: f64 = pmf.iter().zip(sorted).map(|(p, y)| p * y).sum::<f64>() - 3.0;
    let gain = gain_fast(3, predicted.view(), measured.view()).unwrap();
    assert!((gain - expected).abs() < 1e-12, "{gain} vs {expected}");
}
