//! Per-group distribution of readmission ratios
//!
//! Box-plot style summaries (count, mean, quartiles, range) of the measured
//! ratios, split by any `GroupingField`. Rows without a ratio or without a
//! group value are left out.

use super::long::GroupingField;
use crate::join::JoinedRecord;
use crate::stats::descriptive::{mean, quantile_sorted};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupDistribution {
    pub group: String,
    pub n: usize,
    pub mean: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub min: f64,
    pub max: f64,
}

pub fn ratio_distribution(rows: &[JoinedRecord<'_>], grouping: GroupingField) -> Vec<GroupDistribution> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let Some(ratio) = row.ratio().filter(|r| r.is_finite()) else {
            continue;
        };
        if let Some(group) = grouping.value_of(row.hospital, row.status) {
            groups.entry(group).or_default().push(ratio);
        }
    }

    groups
        .into_iter()
        .map(|(group, mut values)| {
            values.sort_by(f64::total_cmp);
            GroupDistribution {
                n: values.len(),
                mean: mean(&values),
                median: quantile_sorted(&values, 0.5),
                q1: quantile_sorted(&values, 0.25),
                q3: quantile_sorted(&values, 0.75),
                min: values[0],
                max: values[values.len() - 1],
                group,
            }
        })
        .collect()
}
