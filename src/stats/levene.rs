//! Levene test for equality of variances
//!
//! One-way ANOVA on absolute deviations from each group's centre. Median
//! centring (Brown-Forsythe) is the default.

use super::descriptive::{mean, median};
use super::design::Factor;
use super::distributions::f_sf;
use super::{TestKind, VarianceTestResult};
use crate::error::{AnalysisError, StepOutcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeveneCenter {
    #[default]
    Median,
    Mean,
}

pub fn levene(factor: &Factor, response: &[f64], center: LeveneCenter) -> StepOutcome<VarianceTestResult> {
    factor.require_levels()?;

    let k = factor.n_levels();
    let n = response.len();
    if n <= k {
        return Err(AnalysisError::precondition(format!(
            "{} observations across {} groups leave no residual degrees of freedom",
            n, k
        )));
    }

    let deviations: Vec<Vec<f64>> = factor
        .groups(response)
        .into_iter()
        .map(|group| {
            let centre = match center {
                LeveneCenter::Median => median(&group),
                LeveneCenter::Mean => mean(&group),
            };
            group.iter().map(|v| (v - centre).abs()).collect()
        })
        .collect();

    let group_means: Vec<f64> = deviations.iter().map(|z| mean(z)).collect();
    let grand_mean = deviations.iter().flatten().sum::<f64>() / n as f64;

    let between: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, m)| z.len() as f64 * (m - grand_mean).powi(2))
        .sum();
    let within: f64 = deviations
        .iter()
        .zip(&group_means)
        .map(|(z, m)| z.iter().map(|v| (v - m).powi(2)).sum::<f64>())
        .sum();

    if within <= 0.0 {
        return Err(AnalysisError::precondition(
            "absolute deviations show no within-group variation",
        ));
    }

    let df_num = (k - 1) as f64;
    let df_den = (n - k) as f64;
    let statistic = (df_den / df_num) * between / within;

    Ok(VarianceTestResult {
        kind: TestKind::Levene,
        label: factor.name().to_string(),
        statistic,
        df_num,
        df_den: Some(df_den),
        p_value: f_sf(statistic, df_num, df_den),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_brown_forsythe_by_hand() {
        // Group 1: {1, 2, 3} median 2 → z {1, 0, 1}
        // Group 2: {2, 6, 10} median 6 → z {4, 0, 4}
        let response = [1.0, 2.0, 3.0, 2.0, 6.0, 10.0];
        let factor = Factor::new("g", &[1u8, 1, 1, 2, 2, 2], |v| v.to_string());

        let result = levene(&factor, &response, LeveneCenter::Median).unwrap();
        // z̄1 = 2/3, z̄2 = 8/3, z̄ = 5/3
        // between = 3(1) + 3(1) = 6; within = 2/3 + 32/3 = 34/3
        assert_relative_eq!(result.statistic, 4.0 * 6.0 / (34.0 / 3.0), epsilon = 1e-12);
        assert_eq!(result.df_num, 1.0);
        assert_eq!(result.df_den, Some(4.0));
        assert!(result.p_value > 0.0 && result.p_value < 1.0);
    }

    #[test]
    fn test_single_level_is_not_applicable() {
        let factor = Factor::new("g", &[1u8, 1, 1], |v| v.to_string());
        let err = levene(&factor, &[1.0, 2.0, 3.0], LeveneCenter::Median).unwrap_err();
        assert!(err.is_not_applicable());
    }

    #[test]
    fn test_row_order_invariance() {
        let response = [0.9, 1.1, 1.3, 0.8, 1.0, 1.7, 0.95, 1.05];
        let groups = [1u8, 2, 1, 2, 1, 2, 1, 2];
        let forward = levene(&Factor::new("g", &groups, |v| v.to_string()), &response, LeveneCenter::Mean).unwrap();

        let mut rev_response = response;
        rev_response.reverse();
        let mut rev_groups = groups;
        rev_groups.reverse();
        let backward = levene(&Factor::new("g", &rev_groups, |v| v.to_string()), &rev_response, LeveneCenter::Mean).unwrap();

        assert_relative_eq!(forward.statistic, backward.statistic, epsilon = 1e-12);
        assert_relative_eq!(forward.p_value, backward.p_value, epsilon = 1e-12);
    }
}
