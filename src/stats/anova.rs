//! Two-way ANOVA
//!
//! Sequential (Type I) tables with treatment coding for the additive and the
//! interaction model, the nested model F-test, and Type III tables with
//! sum-to-zero coding. A term whose columns are all aliased (single-level
//! factor, no estimable interaction contrast) gets a "not applicable" row
//! instead of failing the fit.

use super::design::{Coding, OrthoBasis, Term, TwoWayLayout};
use super::distributions::f_sf;
use super::{TestKind, VarianceTestResult};
use crate::error::{AnalysisError, StepOutcome};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SumOfSquares {
    Sequential,
    TypeIii,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermEffect {
    pub df: usize,
    pub sum_sq: f64,
    pub mean_sq: f64,
    pub f_value: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaRow {
    pub term: String,
    pub effect: StepOutcome<TermEffect>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaTable {
    pub sum_of_squares: SumOfSquares,
    pub rows: Vec<AnovaRow>,
    pub residual_df: usize,
    pub residual_ss: f64,
}

impl AnovaTable {
    pub fn row(&self, term: &str) -> Option<&AnovaRow> {
        self.rows.iter().find(|r| r.term == term)
    }

    pub fn residual_ms(&self) -> f64 {
        self.residual_ss / self.residual_df as f64
    }

    /// Computed rows as test results
    pub fn test_results(&self) -> Vec<VarianceTestResult> {
        let kind = match self.sum_of_squares {
            SumOfSquares::Sequential => TestKind::AnovaTerm,
            SumOfSquares::TypeIii => TestKind::TypeIiiTerm,
        };
        self.rows
            .iter()
            .filter_map(|row| {
                row.effect.as_ref().ok().map(|effect| VarianceTestResult {
                    kind,
                    label: row.term.clone(),
                    statistic: effect.f_value,
                    df_num: effect.df as f64,
                    df_den: Some(self.residual_df as f64),
                    p_value: effect.p_value,
                })
            })
            .collect()
    }
}

/// Least-squares fit of one two-way model
#[derive(Debug, Clone, Serialize)]
pub struct FittedModel {
    pub interaction: bool,
    pub rank: usize,
    pub residual_df: usize,
    pub rss: f64,
    #[serde(skip)]
    pub residuals: Vec<f64>,
    pub table: AnovaTable,
}

impl FittedModel {
    /// Residual mean square
    pub fn mse(&self) -> f64 {
        self.rss / self.residual_df as f64
    }
}

fn model_terms(interaction: bool) -> &'static [Term] {
    if interaction {
        &[Term::Intercept, Term::A, Term::B, Term::Interaction]
    } else {
        &[Term::Intercept, Term::A, Term::B]
    }
}

fn check_residual_df(n: usize, rank: usize) -> Result<usize, AnalysisError> {
    if n <= rank {
        return Err(AnalysisError::precondition(format!(
            "zero residual degrees of freedom ({} observations, rank {})",
            n, rank
        )));
    }
    Ok(n - rank)
}

fn effect_row(
    term: String,
    df: usize,
    sum_sq: f64,
    residual_df: usize,
    residual_ss: f64,
) -> AnovaRow {
    let effect = if df == 0 {
        Err(AnalysisError::precondition(format!(
            "term '{}' has no estimable contrasts",
            term
        )))
    } else if residual_ss <= 0.0 {
        Err(AnalysisError::precondition("residual variance is zero"))
    } else {
        let mean_sq = sum_sq.max(0.0) / df as f64;
        let f_value = mean_sq / (residual_ss / residual_df as f64);
        Ok(TermEffect {
            df,
            sum_sq: sum_sq.max(0.0),
            mean_sq,
            f_value,
            p_value: f_sf(f_value, df as f64, residual_df as f64),
        })
    };
    AnovaRow { term, effect }
}

/// Sequential fit with treatment coding: A, B, then A:B when requested
pub fn fit_two_way(layout: &TwoWayLayout, interaction: bool) -> StepOutcome<FittedModel> {
    let n = layout.n();
    if n == 0 {
        return Err(AnalysisError::precondition("no observations"));
    }
    let y = &layout.response;

    let mut basis = OrthoBasis::new();
    basis.push_term(&Term::Intercept.columns(layout, Coding::Treatment));
    let mut previous_rss = basis.rss(y);

    let mut increments = Vec::new();
    for term in model_terms(interaction).iter().skip(1) {
        let df = basis.push_term(&term.columns(layout, Coding::Treatment));
        let rss = basis.rss(y);
        increments.push((term.label(layout), df, previous_rss - rss));
        previous_rss = rss;
    }

    let residual_df = check_residual_df(n, basis.rank())?;
    let residuals = basis.residuals(y);
    let rss: f64 = residuals.iter().map(|r| r * r).sum();

    let rows = increments
        .into_iter()
        .map(|(term, df, ss)| effect_row(term, df, ss, residual_df, rss))
        .collect();

    Ok(FittedModel {
        interaction,
        rank: basis.rank(),
        residual_df,
        rss,
        residuals,
        table: AnovaTable {
            sum_of_squares: SumOfSquares::Sequential,
            rows,
            residual_df,
            residual_ss: rss,
        },
    })
}

/// Nested-model F-test of `full` against `reduced`
pub fn compare_models(reduced: &FittedModel, full: &FittedModel) -> StepOutcome<VarianceTestResult> {
    if reduced.residual_df <= full.residual_df {
        return Err(AnalysisError::precondition(
            "interaction adds no estimable parameters",
        ));
    }
    if full.rss <= 0.0 {
        return Err(AnalysisError::precondition("residual variance is zero"));
    }

    let df_num = (reduced.residual_df - full.residual_df) as f64;
    let df_den = full.residual_df as f64;
    let statistic = ((reduced.rss - full.rss).max(0.0) / df_num) / (full.rss / df_den);

    Ok(VarianceTestResult {
        kind: TestKind::FComparison,
        label: "interaction vs additive model".to_string(),
        statistic,
        df_num,
        df_den: Some(df_den),
        p_value: f_sf(statistic, df_num, df_den),
    })
}

/// Type III table of the interaction model with sum-to-zero coding
///
/// SS(term) = RSS(model without term) - RSS(full model).
pub fn type_iii(layout: &TwoWayLayout) -> StepOutcome<AnovaTable> {
    let n = layout.n();
    if n == 0 {
        return Err(AnalysisError::precondition("no observations"));
    }
    let y = &layout.response;
    let terms = model_terms(true);

    let columns: Vec<Vec<Vec<f64>>> = terms
        .iter()
        .map(|term| term.columns(layout, Coding::Sum))
        .collect();

    let mut full = OrthoBasis::new();
    for cols in &columns {
        full.push_term(cols);
    }
    let residual_df = check_residual_df(n, full.rank())?;
    let rss_full = full.rss(y);

    let rows = terms
        .iter()
        .enumerate()
        .map(|(dropped, term)| {
            let mut reduced = OrthoBasis::new();
            for (idx, cols) in columns.iter().enumerate() {
                if idx != dropped {
                    reduced.push_term(cols);
                }
            }
            let df = full.rank() - reduced.rank();
            let ss = reduced.rss(y) - rss_full;
            effect_row(term.label(layout), df, ss, residual_df, rss_full)
        })
        .collect();

    Ok(AnovaTable {
        sum_of_squares: SumOfSquares::TypeIii,
        rows,
        residual_df,
        residual_ss: rss_full,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::design::Factor;
    use approx::assert_relative_eq;

    /// Unbalanced 2x3 layout with every cell observed
    fn unbalanced() -> TwoWayLayout {
        let rows: [(u8, u8, f64); 14] = [
            (1, 1, 0.95), (1, 1, 1.02), (1, 1, 0.99),
            (1, 2, 1.10), (1, 2, 1.14),
            (1, 3, 1.01), (1, 3, 0.97), (1, 3, 1.03),
            (2, 1, 0.90), (2, 1, 0.94),
            (2, 2, 1.00), (2, 2, 1.06), (2, 2, 1.03),
            (2, 3, 0.98),
        ];
        let a: Vec<u8> = rows.iter().map(|r| r.0).collect();
        let b: Vec<u8> = rows.iter().map(|r| r.1).collect();
        TwoWayLayout {
            response: rows.iter().map(|r| r.2).collect(),
            a: Factor::new("rating", &a, |v| v.to_string()),
            b: Factor::new("condition", &b, |v| v.to_string()),
        }
    }

    fn total_ss(y: &[f64]) -> f64 {
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        y.iter().map(|v| (v - mean).powi(2)).sum()
    }

    #[test]
    fn test_sequential_table_partitions_total_ss() {
        let layout = unbalanced();
        let model = fit_two_way(&layout, true).unwrap();

        assert_eq!(model.rank, 6);
        assert_eq!(model.residual_df, 8);

        let explained: f64 = model
            .table
            .rows
            .iter()
            .map(|r| r.effect.as_ref().unwrap().sum_sq)
            .sum();
        assert_relative_eq!(explained + model.rss, total_ss(&layout.response), epsilon = 1e-12);

        let dfs: Vec<usize> = model.table.rows.iter().map(|r| r.effect.as_ref().unwrap().df).collect();
        assert_eq!(dfs, vec![1, 2, 2]);
    }

    #[test]
    fn test_one_way_matches_textbook_f() {
        // Single factor with the second factor constant: classic one-way ANOVA
        let y = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 9.0, 10.0];
        let groups = [1u8, 1, 1, 2, 2, 2, 3, 3, 3];
        let layout = TwoWayLayout {
            response: y,
            a: Factor::new("g", &groups, |v| v.to_string()),
            b: Factor::new("const", &[0u8; 9], |v| v.to_string()),
        };
        let model = fit_two_way(&layout, false).unwrap();

        // Group means 2, 5, 9; grand mean 48/9
        let effect = model.table.rows[0].effect.as_ref().unwrap();
        assert_eq!(effect.df, 2);
        assert_relative_eq!(effect.sum_sq, 74.0, epsilon = 1e-10);
        assert_relative_eq!(model.rss, 6.0, epsilon = 1e-10);
        assert_relative_eq!(effect.f_value, 37.0, epsilon = 1e-10);

        // The constant factor is not applicable but does not break the fit
        assert!(model.table.rows[1].effect.as_ref().unwrap_err().is_not_applicable());
    }

    #[test]
    fn test_model_comparison() {
        let layout = unbalanced();
        let additive = fit_two_way(&layout, false).unwrap();
        let full = fit_two_way(&layout, true).unwrap();

        let test = compare_models(&additive, &full).unwrap();
        assert_eq!(test.df_num, 2.0);
        assert_eq!(test.df_den, Some(8.0));

        // Equals the sequential interaction row
        let interaction = full.table.row("rating:condition").unwrap().effect.as_ref().unwrap();
        assert_relative_eq!(test.statistic, interaction.f_value, epsilon = 1e-9);
        assert!((0.0..=1.0).contains(&test.p_value));
    }

    #[test]
    fn test_type_iii_agrees_with_sequential_for_last_term() {
        let layout = unbalanced();
        let sequential = fit_two_way(&layout, true).unwrap();
        let table = type_iii(&layout).unwrap();

        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.residual_df, sequential.residual_df);
        assert_relative_eq!(table.residual_ss, sequential.rss, epsilon = 1e-12);

        let last_seq = sequential.table.row("rating:condition").unwrap().effect.as_ref().unwrap();
        let last_iii = table.row("rating:condition").unwrap().effect.as_ref().unwrap();
        assert_relative_eq!(last_seq.sum_sq, last_iii.sum_sq, epsilon = 1e-10);

        let rating = table.row("rating").unwrap().effect.as_ref().unwrap();
        assert_eq!(rating.df, 1);
        assert!(rating.p_value >= 0.0 && rating.p_value <= 1.0);
    }

    #[test]
    fn test_type_iii_balanced_equals_sequential() {
        // In a balanced design every decomposition agrees
        let a = [1u8, 1, 1, 1, 2, 2, 2, 2];
        let b = [1u8, 1, 2, 2, 1, 1, 2, 2];
        let y = vec![1.0, 1.2, 1.5, 1.4, 0.8, 0.9, 1.9, 2.1];
        let layout = TwoWayLayout {
            response: y,
            a: Factor::new("a", &a, |v| v.to_string()),
            b: Factor::new("b", &b, |v| v.to_string()),
        };
        let sequential = fit_two_way(&layout, true).unwrap();
        let table = type_iii(&layout).unwrap();

        for term in ["a", "b", "a:b"] {
            let s = sequential.table.row(term).unwrap().effect.as_ref().unwrap();
            let t = table.row(term).unwrap().effect.as_ref().unwrap();
            assert_relative_eq!(s.sum_sq, t.sum_sq, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_type_iii_unbalanced_main_effects_use_unweighted_cell_means() {
        // Cell means 1.5, 4, 3.75, 7 with cell sizes 2, 3, 4, 1
        let rows: [(u8, u8, f64); 10] = [
            (1, 1, 1.0), (1, 1, 2.0),
            (1, 2, 3.0), (1, 2, 5.0), (1, 2, 4.0),
            (2, 1, 2.0), (2, 1, 3.0), (2, 1, 4.0), (2, 1, 6.0),
            (2, 2, 7.0),
        ];
        let a: Vec<u8> = rows.iter().map(|r| r.0).collect();
        let b: Vec<u8> = rows.iter().map(|r| r.1).collect();
        let layout = TwoWayLayout {
            response: rows.iter().map(|r| r.2).collect(),
            a: Factor::new("a", &a, |v| v.to_string()),
            b: Factor::new("b", &b, |v| v.to_string()),
        };
        let table = type_iii(&layout).unwrap();

        // SS = L^2 / sum(1/n_ij) for each contrast L over the cell means
        let inverse_sizes = 1.0 / 2.0 + 1.0 / 3.0 + 1.0 / 4.0 + 1.0;
        let expected = [
            ("a", (1.5 + 4.0) - (3.75 + 7.0)),
            ("b", (4.0 + 7.0) - (1.5 + 3.75)),
            ("a:b", 1.5 - 4.0 - 3.75 + 7.0),
        ];
        for (term, contrast) in expected {
            let effect = table.row(term).unwrap().effect.as_ref().unwrap();
            assert_eq!(effect.df, 1);
            assert_relative_eq!(effect.sum_sq, contrast * contrast / inverse_sizes, epsilon = 1e-9);
        }
        let a_effect = table.row("a").unwrap().effect.as_ref().unwrap();
        assert_relative_eq!(a_effect.sum_sq, 13.23, epsilon = 1e-9);

        assert_eq!(table.residual_df, 6);
        assert_relative_eq!(table.residual_ss, 11.25, epsilon = 1e-9);
    }

    #[test]
    fn test_saturated_model_is_not_applicable() {
        let layout = TwoWayLayout {
            response: vec![1.0, 2.0],
            a: Factor::new("a", &[1u8, 2], |v| v.to_string()),
            b: Factor::new("b", &[1u8, 1], |v| v.to_string()),
        };
        let err = fit_two_way(&layout, true).unwrap_err();
        assert!(err.is_not_applicable());
    }
}
