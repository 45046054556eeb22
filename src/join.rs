//! Dataset join
//!
//! Hospital table (left) joined with readmission measurements on the hospital
//! identifier. Two views come out of the same left join:
//!
//! - `summary_view`: every hospital; zero-measurement hospitals keep one row
//!   with no measurement
//! - `analysis_view`: the same rows after the configured filters (acute-care
//!   type, excluded state, missing right-side key, missing ratio)
//!
//! Rows borrow from the input records; nothing is cloned or mutated.

use crate::config::JoinConfig;
use crate::model::{
    Condition, HospitalRecord, HospitalStatus, RatioClass, ReadmissionMeasurement,
};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

/// Non-fatal integrity findings of a join
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JoinIntegrityWarning {
    HospitalWithoutMeasurements { hospital_id: String },
    OrphanMeasurement { hospital_id: String, condition: Condition },
}

/// Hospital with its derived program status
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedHospital<'a> {
    pub hospital: &'a HospitalRecord,
    pub status: HospitalStatus,
}

/// One (hospital, condition) row after the join
#[derive(Debug, Clone, Copy)]
pub struct JoinedRecord<'a> {
    pub hospital: &'a HospitalRecord,
    pub status: HospitalStatus,
    pub measurement: Option<&'a ReadmissionMeasurement>,
}

impl<'a> JoinedRecord<'a> {
    pub fn condition(&self) -> Option<Condition> {
        self.measurement.map(|m| m.condition)
    }

    pub fn ratio(&self) -> Option<f64> {
        self.measurement.and_then(|m| m.ratio)
    }

    pub fn ratio_class(&self) -> Option<RatioClass> {
        self.measurement.and_then(|m| m.ratio_class())
    }
}

/// Rows plus the integrity warnings recorded while producing them
#[derive(Debug, Clone)]
pub struct JoinOutcome<'a> {
    pub rows: Vec<JoinedRecord<'a>>,
    pub warnings: Vec<JoinIntegrityWarning>,
}

/// Joins hospitals with measurements and applies the view filters
#[derive(Debug, Clone)]
pub struct DatasetJoiner {
    config: JoinConfig,
}

impl DatasetJoiner {
    pub fn new(config: JoinConfig) -> Self {
        Self { config }
    }

    /// Monitored iff the type matches the program type and the state is not exempt
    pub fn status_of(&self, hospital: &HospitalRecord) -> HospitalStatus {
        if hospital.hospital_type == self.config.monitored_type
            && hospital.state != self.config.excluded_state
        {
            HospitalStatus::HrrpMonitored
        } else {
            HospitalStatus::Exempt
        }
    }

    pub fn classify<'a>(&self, hospitals: &'a [HospitalRecord]) -> Vec<ClassifiedHospital<'a>> {
        hospitals
            .iter()
            .map(|hospital| ClassifiedHospital {
                hospital,
                status: self.status_of(hospital),
            })
            .collect()
    }

    /// All hospitals, measured or not
    pub fn summary_view<'a>(
        &self,
        hospitals: &'a [HospitalRecord],
        measurements: &'a [ReadmissionMeasurement],
    ) -> JoinOutcome<'a> {
        let outcome = self.left_join(hospitals, measurements);
        tracing::info!(
            "Summary view: {} rows from {} hospitals ({} integrity warnings)",
            outcome.rows.len(),
            hospitals.len(),
            outcome.warnings.len()
        );
        outcome
    }

    /// Measured hospitals only, with the configured filters applied
    pub fn analysis_view<'a>(
        &self,
        hospitals: &'a [HospitalRecord],
        measurements: &'a [ReadmissionMeasurement],
    ) -> JoinOutcome<'a> {
        let JoinOutcome { rows, warnings } = self.left_join(hospitals, measurements);
        let before = rows.len();
        let filters = &self.config.filters;

        let rows: Vec<JoinedRecord<'a>> = rows
            .into_iter()
            .filter(|row| {
                !filters.restrict_to_type || row.hospital.hospital_type == self.config.monitored_type
            })
            .filter(|row| !filters.exclude_state || row.hospital.state != self.config.excluded_state)
            .filter(|row| !filters.drop_missing_key || row.measurement.is_some())
            .filter(|row| !filters.drop_missing_ratio || row.ratio().is_some_and(f64::is_finite))
            .collect();

        tracing::info!(
            "Analysis view: {} of {} joined rows kept after filters",
            rows.len(),
            before
        );

        JoinOutcome { rows, warnings }
    }

    fn left_join<'a>(
        &self,
        hospitals: &'a [HospitalRecord],
        measurements: &'a [ReadmissionMeasurement],
    ) -> JoinOutcome<'a> {
        let mut by_hospital: FxHashMap<&str, Vec<&'a ReadmissionMeasurement>> = FxHashMap::default();
        for m in measurements {
            by_hospital.entry(m.hospital_id.as_str()).or_default().push(m);
        }

        let known: FxHashSet<&str> = hospitals.iter().map(|h| h.id.as_str()).collect();
        let mut warnings = Vec::new();
        let mut rows = Vec::with_capacity(measurements.len() + hospitals.len());

        for hospital in hospitals {
            let status = self.status_of(hospital);
            match by_hospital.get(hospital.id.as_str()) {
                Some(matched) => {
                    let mut matched = matched.clone();
                    matched.sort_by_key(|m| m.condition);
                    rows.extend(matched.into_iter().map(|m| JoinedRecord {
                        hospital,
                        status,
                        measurement: Some(m),
                    }));
                }
                None => {
                    warnings.push(JoinIntegrityWarning::HospitalWithoutMeasurements {
                        hospital_id: hospital.id.clone(),
                    });
                    rows.push(JoinedRecord { hospital, status, measurement: None });
                }
            }
        }

        for m in measurements.iter().filter(|m| !known.contains(m.hospital_id.as_str())) {
            tracing::debug!("Measurement {} / {} has no matching hospital", m.hospital_id, m.condition);
            warnings.push(JoinIntegrityWarning::OrphanMeasurement {
                hospital_id: m.hospital_id.clone(),
                condition: m.condition,
            });
        }

        JoinOutcome { rows, warnings }
    }
}
