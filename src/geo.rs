//! Geo view of the hospital summaries
//!
//! Coordinates are split into longitude/latitude; hospitals without a
//! coordinate pair are left out of this view only. Each point carries a class
//! for colour mapping, chosen by a configured scheme: discrete (one class per
//! attribute value) or quantile buckets over a numeric field.

use crate::derive::HospitalSummary;
use crate::error::AnalysisError;
use crate::model::{Condition, HospitalStatus};
use crate::stats::descriptive::quantile_sorted;
use serde::{Deserialize, Serialize};

/// Numeric field used for quantile classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoField {
    MeanRatio,
    ConditionRatio(Condition),
}

impl GeoField {
    /// NaN when missing
    pub fn value(self, summary: &HospitalSummary) -> f64 {
        match self {
            GeoField::MeanRatio => summary.mean_ratio,
            GeoField::ConditionRatio(condition) => summary
                .ratios
                .get(condition.index())
                .copied()
                .flatten()
                .unwrap_or(f64::NAN),
        }
    }
}

/// Categorical field used for discrete classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscreteField {
    Status,
    OverallRating,
    State,
    HasAnyReport,
}

impl DiscreteField {
    pub fn value(self, summary: &HospitalSummary) -> Option<String> {
        match self {
            DiscreteField::Status => Some(summary.status.label().to_string()),
            DiscreteField::OverallRating => summary.overall_rating.map(|r| r.label().to_string()),
            DiscreteField::State => Some(summary.state.clone()),
            DiscreteField::HasAnyReport => Some(if summary.has_any_report { "reported" } else { "not reported" }.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum ClassificationScheme {
    Discrete { field: DiscreteField },
    Quantile { field: GeoField, buckets: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeoClass {
    Category { label: String },
    /// Zero-based bucket with its [lower, upper] cut points
    Bucket { index: usize, lower: f64, upper: f64 },
    Unclassified,
}

impl GeoClass {
    pub fn label(&self) -> String {
        match self {
            GeoClass::Category { label } => label.clone(),
            GeoClass::Bucket { index, lower, upper } => format!("Q{} [{:.3}, {:.3}]", index + 1, lower, upper),
            GeoClass::Unclassified => "Unclassified".to_string(),
        }
    }
}

/// One mapped hospital
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub hospital_id: String,
    pub name: String,
    pub state: String,
    pub status: HospitalStatus,
    pub longitude: f64,
    pub latitude: f64,
    pub mean_ratio: f64,
    pub class: GeoClass,
}

#[derive(Debug, Clone)]
pub struct GeoJoiner {
    scheme: ClassificationScheme,
}

impl GeoJoiner {
    pub fn new(scheme: ClassificationScheme) -> Self {
        Self { scheme }
    }

    pub fn join(&self, summaries: &[HospitalSummary]) -> Result<Vec<GeoPoint>, AnalysisError> {
        let located: Vec<(&HospitalSummary, f64, f64)> = summaries
            .iter()
            .filter_map(|s| s.coordinates.map(|(lon, lat)| (s, lon, lat)))
            .collect();

        let classes = match self.scheme {
            ClassificationScheme::Discrete { field } => located
                .iter()
                .map(|(s, _, _)| match field.value(s) {
                    Some(label) => GeoClass::Category { label },
                    None => GeoClass::Unclassified,
                })
                .collect::<Vec<_>>(),
            ClassificationScheme::Quantile { field, buckets } => {
                if buckets == 0 {
                    return Err(AnalysisError::precondition("quantile scheme needs at least one bucket"));
                }
                let values: Vec<f64> = located.iter().map(|(s, _, _)| field.value(s)).collect();
                quantile_classes(&values, buckets)
            }
        };

        tracing::info!(
            "Geo view: {} of {} hospitals have coordinates",
            located.len(),
            summaries.len()
        );

        Ok(located
            .into_iter()
            .zip(classes)
            .map(|((s, longitude, latitude), class)| GeoPoint {
                hospital_id: s.hospital_id.clone(),
                name: s.name.clone(),
                state: s.state.clone(),
                status: s.status,
                longitude,
                latitude,
                mean_ratio: s.mean_ratio,
                class,
            })
            .collect())
    }
}

/// Type-7 quantile cut points over the finite values; NaN is unclassified
fn quantile_classes(values: &[f64], buckets: usize) -> Vec<GeoClass> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    finite.sort_by(f64::total_cmp);
    if finite.is_empty() {
        return vec![GeoClass::Unclassified; values.len()];
    }

    let cuts: Vec<f64> = (0..=buckets)
        .map(|i| quantile_sorted(&finite, i as f64 / buckets as f64))
        .collect();

    values
        .iter()
        .map(|&v| {
            if !v.is_finite() {
                return GeoClass::Unclassified;
            }
            let index = (0..buckets).find(|&i| v <= cuts[i + 1]).unwrap_or(buckets - 1);
            GeoClass::Bucket { index, lower: cuts[index], upper: cuts[index + 1] }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OverallRating;
    use crate::normalize::parse_coordinates;

    fn summary(id: &str, coordinates: Option<(f64, f64)>, mean_ratio: f64) -> HospitalSummary {
        HospitalSummary {
            hospital_id: id.to_string(),
            name: format!("Hospital {}", id),
            state: "KS".to_string(),
            status: HospitalStatus::HrrpMonitored,
            overall_rating: Some(OverallRating::Three),
            coordinates,
            ratios: vec![None; Condition::ALL.len()],
            has_any_report: !mean_ratio.is_nan(),
            mean_ratio,
        }
    }

    #[test]
    fn test_coordinate_pair_splits_exactly() {
        let coordinates = parse_coordinates("[-98.5, 39.8]");
        let joiner = GeoJoiner::new(ClassificationScheme::Discrete { field: DiscreteField::Status });
        let points = joiner.join(&[summary("A", coordinates, 1.0)]).unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].longitude, -98.5);
        assert_eq!(points[0].latitude, 39.8);
        assert_eq!(points[0].class, GeoClass::Category { label: "HRRP-monitored".to_string() });
    }

    #[test]
    fn test_missing_coordinates_dropped() {
        let joiner = GeoJoiner::new(ClassificationScheme::Discrete { field: DiscreteField::OverallRating });
        let summaries = vec![
            summary("A", Some((-90.0, 30.0)), 1.0),
            summary("B", None, 1.1),
        ];
        let points = joiner.join(&summaries).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].hospital_id, "A");
    }

    #[test]
    fn test_quantile_buckets() {
        let joiner = GeoJoiner::new(ClassificationScheme::Quantile { field: GeoField::MeanRatio, buckets: 4 });
        let summaries: Vec<HospitalSummary> = [0.8, 0.9, 1.0, 1.1, 1.2, f64::NAN]
            .iter()
            .enumerate()
            .map(|(i, r)| summary(&format!("H{}", i), Some((-90.0, 30.0)), *r))
            .collect();
        let points = joiner.join(&summaries).unwrap();

        let indices: Vec<Option<usize>> = points
            .iter()
            .map(|p| match p.class {
                GeoClass::Bucket { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        // Cut points 0.8, 0.9, 1.0, 1.1, 1.2
        assert_eq!(indices, vec![Some(0), Some(0), Some(1), Some(2), Some(3), None]);
        assert_eq!(points[5].class, GeoClass::Unclassified);
    }

    #[test]
    fn test_zero_buckets_rejected() {
        let joiner = GeoJoiner::new(ClassificationScheme::Quantile { field: GeoField::MeanRatio, buckets: 0 });
        assert!(joiner.join(&[summary("A", Some((0.0, 0.0)), 1.0)]).is_err());
    }

    #[test]
    fn test_scheme_from_json() {
        let scheme: ClassificationScheme =
            serde_json::from_str(r#"{ "scheme": "quantile", "field": { "condition_ratio": "HF" }, "buckets": 3 }"#).unwrap();
        assert_eq!(
            scheme,
            ClassificationScheme::Quantile { field: GeoField::ConditionRatio(Condition::Hf), buckets: 3 }
        );
    }
}
