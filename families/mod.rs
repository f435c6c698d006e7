//! Family tables: loading, grouping and the cross-family summaries built on the estimators.

pub mod aggregate;
pub mod data;

pub use aggregate::{
    AggregateError, AnalysisReport, GainSummary, NullVarianceSummary, average_gain,
    null_gain_variance, run_analysis,
};
pub use data::{DataError, Family, FamilyTable, eligible_families, load_family_table};
