//! Variance analysis of readmission ratios
//!
//! Response: readmission ratio. Factors: overall rating and condition.
//!
//! Steps run in a fixed order and each keeps its own outcome:
//! 1. Levene for rating, condition and their cells (independent)
//! 2. Additive and interaction fits
//! 3. Nested model F-test (needs both fits)
//! 4. Residual normality (needs the interaction fit)
//! 5. Type III table (needs the interaction fit)

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, StepOutcome};
use crate::join::JoinedRecord;
use crate::model::{Condition, OverallRating};
use crate::stats::anova::{compare_models, fit_two_way, type_iii, AnovaTable, FittedModel};
use crate::stats::design::{Factor, TwoWayLayout};
use crate::stats::levene::levene;
use crate::stats::VarianceTestResult;
use serde::Serialize;

pub const RATING_FACTOR: &str = "overall_rating";
pub const CONDITION_FACTOR: &str = "condition";

/// Outcome of a test identified by what it was run on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledOutcome {
    pub label: String,
    pub outcome: StepOutcome<VarianceTestResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VarianceReport {
    pub observations: usize,
    /// Rows dropped because rating, condition or ratio is missing
    pub excluded: usize,
    pub levene: Vec<LabeledOutcome>,
    pub additive: StepOutcome<FittedModel>,
    pub interaction: StepOutcome<FittedModel>,
    pub comparison: StepOutcome<VarianceTestResult>,
    pub normality: Vec<LabeledOutcome>,
    pub type_iii: StepOutcome<AnovaTable>,
    #[serde(skip)]
    pub layout: TwoWayLayout,
}

impl VarianceReport {
    /// True when the comparison test says the interaction should be kept
    pub fn interaction_significant(&self, alpha: f64) -> Option<bool> {
        self.comparison.as_ref().ok().map(|t| t.is_significant(alpha))
    }
}

/// Rating × condition layout of the measured rows
pub fn build_layout(rows: &[JoinedRecord<'_>]) -> (TwoWayLayout, usize) {
    let mut response = Vec::with_capacity(rows.len());
    let mut ratings: Vec<OverallRating> = Vec::with_capacity(rows.len());
    let mut conditions: Vec<Condition> = Vec::with_capacity(rows.len());

    for row in rows {
        let (Some(ratio), Some(rating), Some(condition)) = (
            row.ratio().filter(|r| r.is_finite()),
            row.hospital.overall_rating,
            row.condition(),
        ) else {
            continue;
        };
        response.push(ratio);
        ratings.push(rating);
        conditions.push(condition);
    }

    let excluded = rows.len() - response.len();
    let layout = TwoWayLayout {
        response,
        a: Factor::new(RATING_FACTOR, &ratings, |r| r.label().to_string()),
        b: Factor::new(CONDITION_FACTOR, &conditions, |c| c.code().to_string()),
    };
    (layout, excluded)
}

#[derive(Debug, Clone)]
pub struct VarianceAnalyzer {
    config: AnalysisConfig,
}

impl VarianceAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, rows: &[JoinedRecord<'_>]) -> VarianceReport {
        let (layout, excluded) = build_layout(rows);
        tracing::info!(
            "Variance analysis: {} observations ({} rows excluded), {} ratings x {} conditions",
            layout.n(),
            excluded,
            layout.a.n_levels(),
            layout.b.n_levels()
        );

        // STEP 1: Levene (independent of the model fits)
        let cells = layout.cells();
        let levene_results: Vec<LabeledOutcome> = [&layout.a, &layout.b, &cells]
            .into_iter()
            .map(|factor| LabeledOutcome {
                label: factor.name().to_string(),
                outcome: levene(factor, &layout.response, self.config.levene_center),
            })
            .collect();
        for result in &levene_results {
            log_outcome("Levene", &result.label, &result.outcome);
        }

        // STEP 2: additive and interaction models
        let additive = fit_two_way(&layout, false);
        let interaction = fit_two_way(&layout, true);
        if let Err(err) = &interaction {
            tracing::warn!("Interaction model not fitted: {}", err);
        }

        // STEP 3: nested comparison
        let comparison = match (&additive, &interaction) {
            (Ok(reduced), Ok(full)) => compare_models(reduced, full),
            (Err(err), _) | (_, Err(err)) => Err(AnalysisError::dependency("model comparison", err)),
        };
        log_outcome("Model comparison", "interaction", &comparison);

        // STEP 4: residual normality
        let normality: Vec<LabeledOutcome> = self
            .config
            .normality_tests
            .iter()
            .map(|test| LabeledOutcome {
                label: test.label().to_string(),
                outcome: match &interaction {
                    Ok(model) => test.run(&model.residuals),
                    Err(err) => Err(AnalysisError::dependency("residual normality", err)),
                },
            })
            .collect();
        for result in &normality {
            log_outcome("Normality", &result.label, &result.outcome);
        }

        // STEP 5: Type III
        let type_iii_table = match &interaction {
            Ok(_) => type_iii(&layout),
            Err(err) => Err(AnalysisError::dependency("type III ANOVA", err)),
        };

        VarianceReport {
            observations: layout.n(),
            excluded,
            levene: levene_results,
            additive,
            interaction,
            comparison,
            normality,
            type_iii: type_iii_table,
            layout,
        }
    }
}

fn log_outcome(step: &str, label: &str, outcome: &StepOutcome<VarianceTestResult>) {
    match outcome {
        Ok(result) => tracing::debug!(
            "{} [{}]: statistic {:.4}, p {:.4e}",
            step,
            label,
            result.statistic,
            result.p_value
        ),
        Err(err) => tracing::info!("{} [{}]: {}", step, label, err),
    }
}
