//! Normality checks for model residuals
//!
//! Both tests stay valid for arbitrarily large samples.

use super::descriptive::{mean, sample_variance};
use super::distributions::{chi2_sf, kolmogorov_sf, normal_cdf};
use super::{TestKind, VarianceTestResult};
use crate::error::{AnalysisError, StepOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalityTest {
    KolmogorovSmirnov,
    DagostinoPearson,
}

impl NormalityTest {
    pub fn label(self) -> &'static str {
        match self {
            NormalityTest::KolmogorovSmirnov => "Kolmogorov-Smirnov",
            NormalityTest::DagostinoPearson => "D'Agostino-Pearson",
        }
    }

    pub fn run(self, values: &[f64]) -> StepOutcome<VarianceTestResult> {
        match self {
            NormalityTest::KolmogorovSmirnov => ks_normal(values),
            NormalityTest::DagostinoPearson => dagostino_pearson(values),
        }
    }
}

/// Two-sided Kolmogorov-Smirnov test against a normal with the sample's mean and sd
///
/// p-value from the asymptotic Kolmogorov distribution with Stephens'
/// correction `(√n + 0.12 + 0.11/√n)·D`.
pub fn ks_normal(values: &[f64]) -> StepOutcome<VarianceTestResult> {
    let n = values.len();
    if n < 3 {
        return Err(AnalysisError::precondition(format!(
            "Kolmogorov-Smirnov needs at least 3 values, got {}",
            n
        )));
    }

    let mu = mean(values);
    let sd = sample_variance(values).sqrt();
    if sd.is_nan() || sd <= 0.0 {
        return Err(AnalysisError::precondition("residuals have zero variance"));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let nf = n as f64;
    let d = sorted
        .iter()
        .enumerate()
        .map(|(i, x)| {
            let cdf = normal_cdf((x - mu) / sd);
            let above = (i + 1) as f64 / nf - cdf;
            let below = cdf - i as f64 / nf;
            above.max(below)
        })
        .fold(0.0, f64::max);

    let sqrt_n = nf.sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d;

    Ok(VarianceTestResult {
        kind: TestKind::KolmogorovSmirnov,
        label: "residuals".to_string(),
        statistic: d,
        df_num: nf,
        df_den: None,
        p_value: kolmogorov_sf(lambda),
    })
}

/// D'Agostino-Pearson K² omnibus test from sample skewness and kurtosis
pub fn dagostino_pearson(values: &[f64]) -> StepOutcome<VarianceTestResult> {
    let n = values.len();
    if n < 20 {
        return Err(AnalysisError::precondition(format!(
            "D'Agostino-Pearson needs at least 20 values, got {}",
            n
        )));
    }

    let nf = n as f64;
    let mu = mean(values);
    let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), v| {
        let d = v - mu;
        (m2 + d * d, m3 + d * d * d, m4 + d * d * d * d)
    });
    let (m2, m3, m4) = (m2 / nf, m3 / nf, m4 / nf);
    if m2.is_nan() || m2 <= 0.0 {
        return Err(AnalysisError::precondition("residuals have zero variance"));
    }

    let skewness = m3 / m2.powf(1.5);
    let kurtosis = m4 / (m2 * m2);
    let z_skew = skew_z(skewness, nf);
    let z_kurt = kurtosis_z(kurtosis, nf);
    let k2 = z_skew * z_skew + z_kurt * z_kurt;

    Ok(VarianceTestResult {
        kind: TestKind::DagostinoPearson,
        label: "residuals".to_string(),
        statistic: k2,
        df_num: 2.0,
        df_den: None,
        p_value: chi2_sf(k2, 2.0),
    })
}

fn skew_z(b1: f64, n: f64) -> f64 {
    let y = b1 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    delta * (y / alpha).asinh()
}

fn kurtosis_z(b2: f64, n: f64) -> f64 {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let variance = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0).powi(2) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / variance.sqrt();

    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0 + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());

    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    let term2 = if denom == 0.0 {
        f64::NAN
    } else {
        denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt()
    };
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}
