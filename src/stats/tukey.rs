//! Tukey-Kramer pairwise comparisons
//!
//! q = |m_i - m_j| / sqrt(MSE/2 · (1/n_i + 1/n_j)), adjusted p = P(Q ≥ q) from
//! the studentized range with k group means and the model's residual df.
//! Pairs are evaluated in parallel; output keeps (i, j) order.

use super::descriptive::mean;
use super::design::Factor;
use super::distributions::ptukey;
use crate::error::{AnalysisError, StepOutcome};
use rayon::prelude::*;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseComparison {
    pub first: String,
    pub second: String,
    /// mean(second) - mean(first)
    pub mean_difference: f64,
    pub q_statistic: f64,
    pub p_adjusted: f64,
}

/// All level pairs of `factor`, using the error variance of a fitted model
pub fn tukey_hsd(
    factor: &Factor,
    response: &[f64],
    mse: f64,
    residual_df: usize,
) -> StepOutcome<Vec<PairwiseComparison>> {
    if residual_df < 2 {
        return Err(AnalysisError::precondition(format!(
            "studentized range needs at least 2 residual df, got {}",
            residual_df
        )));
    }
    if mse.is_nan() || mse <= 0.0 {
        return Err(AnalysisError::precondition("residual mean square is zero"));
    }

    let groups = factor.groups(response);
    let k = groups.len();
    let means: Vec<f64> = groups.iter().map(|g| mean(g)).collect();
    let sizes: Vec<f64> = groups.iter().map(|g| g.len() as f64).collect();
    let levels = factor.levels();

    let pairs: Vec<(usize, usize)> = (0..k)
        .flat_map(|i| ((i + 1)..k).map(move |j| (i, j)))
        .collect();

    let comparisons = pairs
        .par_iter()
        .map(|&(i, j)| {
            let diff = means[j] - means[i];
            let se = (mse / 2.0 * (1.0 / sizes[i] + 1.0 / sizes[j])).sqrt();
            let q = diff.abs() / se;
            let p = 1.0 - ptukey(q, k, residual_df as f64);
            PairwiseComparison {
                first: levels[i].clone(),
                second: levels[j].clone(),
                mean_difference: diff,
                q_statistic: q,
                p_adjusted: p.clamp(0.0, 1.0),
            }
        })
        .collect();

    Ok(comparisons)
}
