//! Composite Gauss-Legendre Quadrature
//!
//! The expected-maximum integrals are smooth on a finite window but sharply peaked for
//! large `n`, so they are evaluated by splitting the window into equal panels and
//! applying a fixed Gauss-Legendre rule on each panel.
//!
//! The rule is computed once per context: nodes are the roots of the Legendre
//! polynomial `P_m`, found by Newton iteration on the three-term recurrence, and the
//! weights follow from the derivative at each root. With `m = 20` points a single panel
//! integrates polynomials up to degree 39 exactly.

use std::f64::consts::PI;
use std::sync::OnceLock;

/// Number of nodes in the per-panel rule.
const N_POINTS: usize = 20;
const NEWTON_MAX_ITERATIONS: usize = 100;
const NEWTON_TOLERANCE: f64 = 1e-15;

/// Quadrature context that owns the Gauss-Legendre cache.
pub struct QuadratureContext {
    gl_cache: OnceLock<GaussLegendreRule>,
}

/// Process-wide context, so the rule is solved once no matter how many integrals run.
pub fn shared_quadrature() -> &'static QuadratureContext {
    static SHARED: OnceLock<QuadratureContext> = OnceLock::new();
    SHARED.get_or_init(QuadratureContext::new)
}

impl Default for QuadratureContext {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadratureContext {
    pub fn new() -> Self {
        Self {
            gl_cache: OnceLock::new(),
        }
    }

    fn gauss_legendre(&self) -> &GaussLegendreRule {
        self.gl_cache.get_or_init(compute_gauss_legendre)
    }

    /// Integrates `f` over `[a, b]` with `panels` equal sub-intervals.
    ///
    /// Panel boundaries are never evaluated, so `f` may jump at a boundary.
    pub fn integrate<F>(&self, f: F, a: f64, b: f64, panels: usize) -> f64
    where
        F: Fn(f64) -> f64,
    {
        let rule = self.gauss_legendre();
        let panels = panels.max(1);
        let width = (b - a) / panels as f64;
        let half_width = 0.5 * width;

        let mut total = 0.0;
        for panel in 0..panels {
            let midpoint = a + (panel as f64 + 0.5) * width;
            let panel_sum: f64 = rule
                .nodes
                .iter()
                .zip(rule.weights.iter())
                .map(|(&node, &weight)| weight * f(midpoint + half_width * node))
                .sum();
            total += half_width * panel_sum;
        }
        total
    }
}

/// Gauss-Legendre rule on [-1, 1]: nodes ascending, weights summing to 2.
struct GaussLegendreRule {
    nodes: [f64; N_POINTS],
    weights: [f64; N_POINTS],
}

fn compute_gauss_legendre() -> GaussLegendreRule {
    let mut nodes = [0.0f64; N_POINTS];
    let mut weights = [0.0f64; N_POINTS];

    // Roots come in ± pairs; solve for the positive half, largest first.
    let half = N_POINTS.div_ceil(2);
    for i in 0..half {
        let mut x = (PI * (i as f64 + 0.75) / (N_POINTS as f64 + 0.5)).cos();
        for _ in 0..NEWTON_MAX_ITERATIONS {
            let (value, slope) = legendre_with_derivative(N_POINTS, x);
            let step = value / slope;
            x -= step;
            if step.abs() < NEWTON_TOLERANCE {
                break;
            }
        }
        let (_, slope) = legendre_with_derivative(N_POINTS, x);
        let weight = 2.0 / ((1.0 - x * x) * slope * slope);

        nodes[i] = -x;
        nodes[N_POINTS - 1 - i] = x;
        weights[i] = weight;
        weights[N_POINTS - 1 - i] = weight;
    }

    GaussLegendreRule { nodes, weights }
}

/// Evaluates `P_order(x)` and its derivative via the Bonnet recurrence.
fn legendre_with_derivative(order: usize, x: f64) -> (f64, f64) {
    let mut previous = 1.0;
    let mut current = x;
    for j in 2..=order {
        let j = j as f64;
        let next = ((2.0 * j - 1.0) * x * current - (j - 1.0) * previous) / j;
        previous = current;
        current = next;
    }
    let derivative = order as f64 * (x * current - previous) / (x * x - 1.0);
    (current, derivative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normal::standard_normal_pdf;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_computed_nodes_are_symmetric_and_ascending() {
        let ctx = QuadratureContext::new();
        let gl = ctx.gauss_legendre();
        for i in 0..N_POINTS / 2 {
            let j = N_POINTS - 1 - i;
            assert_relative_eq!(gl.nodes[i], -gl.nodes[j], epsilon = 1e-14);
            assert_relative_eq!(gl.weights[i], gl.weights[j], epsilon = 1e-14);
        }
        for pair in gl.nodes.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert!(gl.nodes.iter().all(|x| x.abs() < 1.0));
    }

    #[test]
    fn test_weights_sum_to_interval_length() {
        let ctx = QuadratureContext::new();
        let sum: f64 = ctx.gauss_legendre().weights.iter().sum();
        assert_relative_eq!(sum, 2.0, epsilon = 1e-13);
    }

    #[test]
    fn test_largest_node_matches_known_value() {
        // Largest root of P_20.
        let ctx = QuadratureContext::new();
        assert_abs_diff_eq!(
            ctx.gauss_legendre().nodes[N_POINTS - 1],
            0.993_128_599_185_094_9,
            epsilon = 1e-13
        );
    }

    #[test]
    fn test_single_panel_is_exact_for_high_degree_polynomials() {
        let ctx = QuadratureContext::new();
        let integral = ctx.integrate(|x| x.powi(38), 0.0, 1.0, 1);
        assert_relative_eq!(integral, 1.0 / 39.0, max_relative = 1e-12);
    }

    #[test]
    fn test_integrates_smooth_functions() {
        let ctx = QuadratureContext::default();
        let integral = ctx.integrate(f64::exp, 0.0, 1.0, 4);
        assert_relative_eq!(integral, std::f64::consts::E - 1.0, max_relative = 1e-14);
    }

    #[test]
    fn test_normal_density_has_unit_mass_on_a_wide_window() {
        let ctx = QuadratureContext::new();
        let mass = ctx.integrate(standard_normal_pdf, -10.0, 10.0, 200);
        assert_abs_diff_eq!(mass, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_panel_boundaries_tolerate_a_step() {
        // Step at 0 with one panel boundary exactly there.
        let ctx = QuadratureContext::new();
        let integral = ctx.integrate(|x| if x > 0.0 { 1.0 } else { -2.0 }, -1.0, 1.0, 2);
        assert_abs_diff_eq!(integral, -1.0, epsilon = 1e-13);
    }

    #[test]
    fn test_shared_context_solves_the_rule_once() {
        let first = shared_quadrature().gauss_legendre();
        let second = shared_quadrature().gauss_legendre();
        assert!(std::ptr::eq(first, second));
        assert_eq!(first.nodes.len(), N_POINTS);
    }
}
