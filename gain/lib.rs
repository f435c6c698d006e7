#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod config;
pub mod hockey;
pub mod normal;
pub mod normax;
pub mod permutation;
pub mod quadrature;
pub mod selection;
pub mod stats;
pub mod types;

#[path = "../families/mod.rs"]
pub mod families;

pub use hockey::{hockey_stick_pmf, hockey_stick_pmf_with};
pub use normax::{ExtremeValueMethod, MonteCarloEstimate, expected_max, simulate_expected_max};
pub use permutation::{PermutationVarianceMethod, permuted_dot_variance};
pub use selection::{GainMethod, selection_gain};
pub use types::{PmfVariant, SelectionError};
