//! Statistical kernels for the variance analysis
//!
//! - `distributions`: normal, F, Kolmogorov and studentized range tails
//! - `design`: factor coding and orthogonal least squares
//! - `anova`: sequential and Type III tables, nested model comparison
//! - `levene`: homogeneity of variance
//! - `normality`: residual goodness of fit
//! - `tukey`: pairwise Tukey-Kramer comparisons

pub mod anova;
pub mod descriptive;
pub mod design;
pub mod distributions;
pub mod levene;
pub mod normality;
pub mod tukey;

use serde::Serialize;

/// Kind tag of a reported test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Levene,
    FComparison,
    KolmogorovSmirnov,
    DagostinoPearson,
    AnovaTerm,
    TypeIiiTerm,
}

impl TestKind {
    pub fn label(self) -> &'static str {
        match self {
            TestKind::Levene => "Levene",
            TestKind::FComparison => "F comparison",
            TestKind::KolmogorovSmirnov => "Kolmogorov-Smirnov",
            TestKind::DagostinoPearson => "D'Agostino-Pearson",
            TestKind::AnovaTerm => "ANOVA term",
            TestKind::TypeIiiTerm => "Type III term",
        }
    }
}

/// Statistic, degrees of freedom and p-value of one test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceTestResult {
    pub kind: TestKind,
    pub label: String,
    pub statistic: f64,
    /// Numerator df (or sample size for the goodness-of-fit tests)
    pub df_num: f64,
    pub df_den: Option<f64>,
    pub p_value: f64,
}

impl VarianceTestResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}
