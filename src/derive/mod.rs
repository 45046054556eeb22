//! Derived metrics over the joined views
//!
//! - `wide`: condition pivot and per-hospital summary
//! - `long`: national-comparison metrics in long form with within-group shares
//! - `distribution`: ratio distribution per group

pub mod distribution;
pub mod long;
pub mod wide;

pub use distribution::{ratio_distribution, GroupDistribution};
pub use long::{category_shares, melt_comparisons, CategoryShare, ComparisonObservation, GroupingField};
pub use wide::{
    condition_ratio_classes, mean_present, pivot_conditions, summarize_hospitals, ConditionRatioClasses,
    ConditionTable, HospitalSummary,
};
