//! Variance analysis and post-hoc summaries over the analysis view

pub mod posthoc;
pub mod variance;

pub use posthoc::{PosthocOutcome, PosthocSummarizer, PosthocSummary};
pub use variance::{build_layout, LabeledOutcome, VarianceAnalyzer, VarianceReport, CONDITION_FACTOR, RATING_FACTOR};
