//! Wide pivot of condition ratios and per-hospital summary
//!
//! (hospital, condition, ratio) rows → one row per hospital with one column
//! per condition, followed by `has_any_report` / `mean_ratio`.

use crate::error::AnalysisError;
use crate::join::JoinedRecord;
use crate::model::{Condition, HospitalStatus, OverallRating, RatioClass};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Ordered condition columns keyed by hospital identifier
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionTable {
    columns: Vec<Condition>,
    keys: Vec<String>,
    rows: Vec<Vec<Option<f64>>>,
}

impl ConditionTable {
    /// Condition columns, in declared order
    pub fn columns(&self) -> &[Condition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Values of one hospital row, aligned with `columns()`
    pub fn row(&self, hospital_id: &str) -> Option<&[Option<f64>]> {
        self.keys
            .iter()
            .position(|k| k == hospital_id)
            .map(|idx| self.rows[idx].as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.keys
            .iter()
            .map(String::as_str)
            .zip(self.rows.iter().map(Vec::as_slice))
    }
}

/// Per-hospital summary consumed by the table renderer and the geo view
#[derive(Debug, Clone, Serialize)]
pub struct HospitalSummary {
    pub hospital_id: String,
    pub name: String,
    pub state: String,
    pub status: HospitalStatus,
    pub overall_rating: Option<OverallRating>,
    pub coordinates: Option<(f64, f64)>,
    /// Aligned with `Condition::ALL`
    pub ratios: Vec<Option<f64>>,
    pub has_any_report: bool,
    /// NaN when no condition has a ratio
    pub mean_ratio: f64,
}

/// Long → wide: one column per condition keyed by hospital identifier
///
/// Hospitals without measurements keep a row of missing values. A repeated
/// (hospital, condition) pair is a duplicate key.
pub fn pivot_conditions(rows: &[JoinedRecord<'_>]) -> Result<ConditionTable, AnalysisError> {
    let columns = Condition::ALL.to_vec();
    let mut index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut keys: Vec<String> = Vec::new();
    let mut table: Vec<Vec<Option<f64>>> = Vec::new();
    let mut seen: FxHashSet<(&str, Condition)> = FxHashSet::default();

    for row in rows {
        let id = row.hospital.id.as_str();
        let slot = *index.entry(id).or_insert_with(|| {
            keys.push(id.to_string());
            table.push(vec![None; columns.len()]);
            keys.len() - 1
        });

        let Some(measurement) = row.measurement else {
            continue;
        };
        if !seen.insert((id, measurement.condition)) {
            return Err(AnalysisError::DuplicateKey {
                dataset: "condition pivot".to_string(),
                key: format!("{} / {}", id, measurement.condition),
            });
        }
        table[slot][measurement.condition.index()] = measurement.ratio.filter(|r| r.is_finite());
    }

    Ok(ConditionTable { columns, keys, rows: table })
}

/// NaN-safe mean of the present values; NaN when none are present
pub fn mean_present(values: &[Option<f64>]) -> f64 {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Summarize each hospital of the pivot
pub fn summarize_hospitals(
    table: &ConditionTable,
    rows: &[JoinedRecord<'_>],
) -> Vec<HospitalSummary> {
    let mut first_row: FxHashMap<&str, &JoinedRecord<'_>> = FxHashMap::default();
    for row in rows {
        first_row.entry(row.hospital.id.as_str()).or_insert(row);
    }

    table
        .iter()
        .filter_map(|(id, values)| {
            let row = first_row.get(id)?;
            let has_any_report = values.iter().any(Option::is_some);
            Some(HospitalSummary {
                hospital_id: id.to_string(),
                name: row.hospital.name.clone(),
                state: row.hospital.state.clone(),
                status: row.status,
                overall_rating: row.hospital.overall_rating,
                coordinates: row.hospital.coordinates,
                ratios: values.to_vec(),
                has_any_report,
                mean_ratio: mean_present(values),
            })
        })
        .collect()
}

/// Count of ratio classes per condition across the measured rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionRatioClasses {
    pub condition: Condition,
    pub at_or_above: usize,
    pub below: usize,
}

pub fn condition_ratio_classes(rows: &[JoinedRecord<'_>]) -> Vec<ConditionRatioClasses> {
    Condition::ALL
        .iter()
        .map(|condition| {
            let classes = rows
                .iter()
                .filter(|r| r.condition() == Some(*condition))
                .filter_map(|r| r.ratio_class());
            let (mut at_or_above, mut below) = (0, 0);
            for class in classes {
                match class {
                    RatioClass::AtOrAbove => at_or_above += 1,
                    RatioClass::Below => below += 1,
                }
            }
            ConditionRatioClasses { condition: *condition, at_or_above, below }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JoinConfig;
    use crate::join::fixtures::{hospital, measurement};
    use crate::join::DatasetJoiner;
    use approx::assert_relative_eq;

    const ACUTE: &str = "Acute Care Hospitals";

    #[test]
    fn test_three_hospital_scenario() {
        let hs = vec![
            hospital("H1", "AL", ACUTE, None),
            hospital("H2", "AL", ACUTE, None),
            hospital("H3", "AL", ACUTE, None),
        ];
        let ms = vec![
            measurement("H1", Condition::Hf, Some(0.9)),
            measurement("H2", Condition::Hf, Some(1.1)),
            measurement("H3", Condition::Hf, None),
        ];
        let joiner = DatasetJoiner::new(JoinConfig::default());
        let view = joiner.summary_view(&hs, &ms);

        let table = pivot_conditions(&view.rows).unwrap();
        let summaries = summarize_hospitals(&table, &view.rows);
        assert_eq!(summaries.len(), 3);

        let hf_ratios: Vec<f64> = summaries
            .iter()
            .filter_map(|s| s.ratios[2])
            .collect();
        let hf_mean = hf_ratios.iter().sum::<f64>() / hf_ratios.len() as f64;
        assert_relative_eq!(hf_mean, 1.0, epsilon = 1e-12);

        assert!(summaries[0].has_any_report);
        assert!(summaries[1].has_any_report);
        assert!(!summaries[2].has_any_report);
        assert_relative_eq!(summaries[0].mean_ratio, 0.9, epsilon = 1e-12);
        assert!(summaries[2].mean_ratio.is_nan());
    }

    #[test]
    fn test_unmeasured_hospital_has_nan_mean() {
        let hs = vec![hospital("H1", "AL", ACUTE, None)];
        let joiner = DatasetJoiner::new(JoinConfig::default());
        let view = joiner.summary_view(&hs, &[]);

        let table = pivot_conditions(&view.rows).unwrap();
        assert_eq!(table.row("H1").unwrap(), &[None; 6]);

        let summaries = summarize_hospitals(&table, &view.rows);
        assert!(!summaries[0].has_any_report);
        assert!(summaries[0].mean_ratio.is_nan());
    }

    #[test]
    fn test_duplicate_pair_rejected_even_when_first_ratio_missing() {
        let h = hospital("H1", "AL", ACUTE, None);
        let missing = measurement("H1", Condition::Hf, None);
        let repeat = measurement("H1", Condition::Hf, Some(1.02));
        let rows: Vec<JoinedRecord<'_>> = [&missing, &repeat]
            .into_iter()
            .map(|m| JoinedRecord { hospital: &h, status: HospitalStatus::HrrpMonitored, measurement: Some(m) })
            .collect();

        let err = pivot_conditions(&rows).unwrap_err();
        assert!(matches!(err, AnalysisError::DuplicateKey { .. }));
    }

    #[test]
    fn test_mean_ignores_missing() {
        assert_relative_eq!(mean_present(&[Some(1.0), None, Some(2.0)]), 1.5);
        assert!(mean_present(&[None, None]).is_nan());
        assert!(mean_present(&[]).is_nan());
    }

    #[test]
    fn test_ratio_classes() {
        let hs = vec![hospital("H1", "AL", ACUTE, None), hospital("H2", "AL", ACUTE, None)];
        let ms = vec![
            measurement("H1", Condition::Ami, Some(1.0)),
            measurement("H2", Condition::Ami, Some(0.99)),
            measurement("H2", Condition::Copd, None),
        ];
        let joiner = DatasetJoiner::new(JoinConfig::default());
        let view = joiner.summary_view(&hs, &ms);

        let classes = condition_ratio_classes(&view.rows);
        assert_eq!(classes[0], ConditionRatioClasses { condition: Condition::Ami, at_or_above: 1, below: 1 });
        assert_eq!(classes[1].at_or_above + classes[1].below, 0);
    }
}
