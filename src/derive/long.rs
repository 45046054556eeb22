//! Long form of the national-comparison metrics
//!
//! Wide metric columns → (hospital, metric, category) triples, then counts per
//! (group, metric, category) as a percentage of the (group, metric) total.
//! Missing categories are dropped before counting, so they never inflate a
//! group total.

use crate::error::AnalysisError;
use crate::join::ClassifiedHospital;
use crate::model::{ComparisonCategory, ComparisonMetric, HospitalRecord, HospitalStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Hospital attribute used to split the share table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupingField {
    Status,
    HospitalType,
    Ownership,
    State,
    EmergencyServices,
    OverallRating,
}

impl GroupingField {
    /// Group label of one hospital; `None` when the attribute is missing
    pub fn value_of(self, hospital: &HospitalRecord, status: HospitalStatus) -> Option<String> {
        match self {
            GroupingField::Status => Some(status.label().to_string()),
            GroupingField::HospitalType => Some(hospital.hospital_type.clone()),
            GroupingField::Ownership => hospital.ownership.clone(),
            GroupingField::State => Some(hospital.state.clone()),
            GroupingField::EmergencyServices => hospital
                .emergency_services
                .map(|flag| if flag { "Yes" } else { "No" }.to_string()),
            GroupingField::OverallRating => hospital.overall_rating.map(|r| r.label().to_string()),
        }
    }
}

impl FromStr for GroupingField {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "status" => Ok(GroupingField::Status),
            "hospital_type" => Ok(GroupingField::HospitalType),
            "ownership" => Ok(GroupingField::Ownership),
            "state" => Ok(GroupingField::State),
            "emergency_services" => Ok(GroupingField::EmergencyServices),
            "overall_rating" => Ok(GroupingField::OverallRating),
            other => Err(AnalysisError::UnknownGroupingField(other.to_string())),
        }
    }
}

/// One present (hospital, metric, category) triple
#[derive(Debug, Clone, Copy)]
pub struct ComparisonObservation<'a> {
    pub hospital: ClassifiedHospital<'a>,
    pub metric: ComparisonMetric,
    pub category: ComparisonCategory,
}

/// Within-group share of one category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub group: String,
    pub metric: ComparisonMetric,
    pub category: ComparisonCategory,
    pub count: usize,
    /// count / (group, metric) total × 100
    pub percent: f64,
}

/// Wide → long, dropping missing categories
pub fn melt_comparisons<'a>(hospitals: &[ClassifiedHospital<'a>]) -> Vec<ComparisonObservation<'a>> {
    hospitals
        .iter()
        .flat_map(|classified| {
            ComparisonMetric::ALL.iter().filter_map(move |metric| {
                classified
                    .hospital
                    .comparisons
                    .get(metric)
                    .map(|category| ComparisonObservation {
                        hospital: *classified,
                        metric: *metric,
                        category: *category,
                    })
            })
        })
        .collect()
}

/// Percentage table per (group, metric, category)
///
/// Hospitals whose grouping attribute is missing are left out.
pub fn category_shares(
    hospitals: &[ClassifiedHospital<'_>],
    grouping: GroupingField,
) -> Vec<CategoryShare> {
    let mut counts: BTreeMap<(String, ComparisonMetric, ComparisonCategory), usize> = BTreeMap::new();
    let mut totals: BTreeMap<(String, ComparisonMetric), usize> = BTreeMap::new();

    for obs in melt_comparisons(hospitals) {
        let Some(group) = grouping.value_of(obs.hospital.hospital, obs.hospital.status) else {
            continue;
        };
        *totals.entry((group.clone(), obs.metric)).or_default() += 1;
        *counts.entry((group, obs.metric, obs.category)).or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((group, metric, category), count)| {
            let total = totals.get(&(group.clone(), metric)).copied().unwrap_or(count);
            CategoryShare {
                group,
                metric,
                category,
                count,
                percent: count as f64 / total as f64 * 100.0,
            }
        })
        .collect()
}
