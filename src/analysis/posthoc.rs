//! Post-hoc pairwise comparisons on the interaction model
//!
//! Tukey-Kramer comparisons for rating, condition and the observed rating ×
//! condition cells, summarized as the fraction of pairs below alpha.

use super::variance::VarianceReport;
use crate::error::{AnalysisError, StepOutcome};
use crate::stats::tukey::{tukey_hsd, PairwiseComparison};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosthocSummary {
    pub term: String,
    pub pairs: usize,
    pub significant: usize,
    pub fraction_significant: f64,
    pub comparisons: Vec<PairwiseComparison>,
}

impl PosthocSummary {
    fn from_comparisons(term: &str, comparisons: Vec<PairwiseComparison>, alpha: f64) -> Self {
        let pairs = comparisons.len();
        let significant = comparisons.iter().filter(|c| c.p_adjusted < alpha).count();
        Self {
            term: term.to_string(),
            pairs,
            significant,
            fraction_significant: significant as f64 / pairs as f64,
            comparisons,
        }
    }
}

/// Post-hoc result of one term; a failed term leaves the others intact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosthocOutcome {
    pub term: String,
    pub outcome: StepOutcome<PosthocSummary>,
}

#[derive(Debug, Clone)]
pub struct PosthocSummarizer {
    alpha: f64,
}

impl PosthocSummarizer {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    /// Per-term comparisons; fails as a whole only when the interaction fit did
    pub fn summarize(&self, report: &VarianceReport) -> StepOutcome<Vec<PosthocOutcome>> {
        let model = report
            .interaction
            .as_ref()
            .map_err(|err| AnalysisError::dependency("post-hoc comparisons", err))?;

        let layout = &report.layout;
        let cells = layout.cells();

        let outcomes = [&layout.a, &layout.b, &cells]
            .into_iter()
            .map(|factor| {
                let outcome = factor
                    .require_levels()
                    .and_then(|()| tukey_hsd(factor, &layout.response, model.mse(), model.residual_df))
                    .map(|comparisons| PosthocSummary::from_comparisons(factor.name(), comparisons, self.alpha));
                match &outcome {
                    Ok(summary) => tracing::info!(
                        "Post-hoc [{}]: {}/{} pairs significant ({:.1}%)",
                        summary.term,
                        summary.significant,
                        summary.pairs,
                        summary.fraction_significant * 100.0
                    ),
                    Err(err) => tracing::info!("Post-hoc [{}]: not applicable ({})", factor.name(), err),
                }
                PosthocOutcome {
                    term: factor.name().to_string(),
                    outcome,
                }
            })
            .collect();

        Ok(outcomes)
    }
}
