//! Typed records and ordered categorical levels
//!
//! Every categorical used by the pipeline is an enum whose declaration order
//! is its level order. Display tables and ANOVA contrast coding both iterate
//! `LEVELS`, so reordering data rows never changes the coding.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Overall hospital quality rating, levels "1".."5"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OverallRating {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
}

impl OverallRating {
    pub const LEVELS: [OverallRating; 5] = [
        OverallRating::One,
        OverallRating::Two,
        OverallRating::Three,
        OverallRating::Four,
        OverallRating::Five,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OverallRating::One => "1",
            OverallRating::Two => "2",
            OverallRating::Three => "3",
            OverallRating::Four => "4",
            OverallRating::Five => "5",
        }
    }

    /// Parse a rating token. Integral numeric renderings ("3.0") are accepted.
    pub fn from_token(token: &str) -> Option<Self> {
        let trimmed = token.trim();
        if let Some(level) = Self::LEVELS.iter().find(|l| l.label() == trimmed) {
            return Some(*level);
        }
        let value: f64 = trimmed.parse().ok()?;
        if value.fract() != 0.0 {
            return None;
        }
        Self::LEVELS
            .iter()
            .find(|l| l.label() == format!("{}", value as i64))
            .copied()
    }
}

/// Position of a hospital relative to the national average
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonCategory {
    Above,
    Same,
    Below,
}

impl ComparisonCategory {
    pub const LEVELS: [ComparisonCategory; 3] = [
        ComparisonCategory::Above,
        ComparisonCategory::Same,
        ComparisonCategory::Below,
    ];

    /// Canonical (title-cased) token as published in the source data
    pub fn label(self) -> &'static str {
        match self {
            ComparisonCategory::Above => "Above The National Average",
            ComparisonCategory::Same => "Same As The National Average",
            ComparisonCategory::Below => "Below The National Average",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            ComparisonCategory::Above => "Above",
            ComparisonCategory::Same => "Same",
            ComparisonCategory::Below => "Below",
        }
    }

    /// Match an already title-cased token against the canonical labels
    pub fn from_label(token: &str) -> Option<Self> {
        Self::LEVELS.iter().find(|c| c.label() == token).copied()
    }
}

/// Named national-comparison quality metrics of the hospital dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMetric {
    Mortality,
    SafetyOfCare,
    Readmission,
    PatientExperience,
    EffectivenessOfCare,
    TimelinessOfCare,
    EfficientUseOfImaging,
}

impl ComparisonMetric {
    pub const ALL: [ComparisonMetric; 7] = [
        ComparisonMetric::Mortality,
        ComparisonMetric::SafetyOfCare,
        ComparisonMetric::Readmission,
        ComparisonMetric::PatientExperience,
        ComparisonMetric::EffectivenessOfCare,
        ComparisonMetric::TimelinessOfCare,
        ComparisonMetric::EfficientUseOfImaging,
    ];

    /// Column name after normalization
    pub fn column(self) -> &'static str {
        match self {
            ComparisonMetric::Mortality => "mortality",
            ComparisonMetric::SafetyOfCare => "safety_of_care",
            ComparisonMetric::Readmission => "readmission",
            ComparisonMetric::PatientExperience => "patient_experience",
            ComparisonMetric::EffectivenessOfCare => "effectiveness_of_care",
            ComparisonMetric::TimelinessOfCare => "timeliness_of_care",
            ComparisonMetric::EfficientUseOfImaging => "efficient_use_of_imaging",
        }
    }
}

impl fmt::Display for ComparisonMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Readmission condition measured by the penalty program
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = "AMI")]
    Ami,
    #[serde(rename = "COPD")]
    Copd,
    #[serde(rename = "HF")]
    Hf,
    #[serde(rename = "PN")]
    Pn,
    #[serde(rename = "CABG")]
    Cabg,
    #[serde(rename = "HIP-KNEE")]
    HipKnee,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::Ami,
        Condition::Copd,
        Condition::Hf,
        Condition::Pn,
        Condition::Cabg,
        Condition::HipKnee,
    ];

    /// Position in `ALL`
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            Condition::Ami => "AMI",
            Condition::Copd => "COPD",
            Condition::Hf => "HF",
            Condition::Pn => "PN",
            Condition::Cabg => "CABG",
            Condition::HipKnee => "HIP-KNEE",
        }
    }

    /// Parse a bare code ("HF") or a program measure name ("READM-30-HF-HRRP")
    pub fn from_code(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_uppercase();
        let code = upper
            .strip_prefix("READM-30-")
            .unwrap_or(&upper)
            .trim_end_matches("-HRRP");
        Self::ALL.iter().find(|c| c.code() == code).copied()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Whether a hospital is subject to the readmission penalty program
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HospitalStatus {
    #[serde(rename = "HRRP-monitored")]
    HrrpMonitored,
    #[serde(rename = "Exempt")]
    Exempt,
}

impl HospitalStatus {
    pub fn label(self) -> &'static str {
        match self {
            HospitalStatus::HrrpMonitored => "HRRP-monitored",
            HospitalStatus::Exempt => "Exempt",
        }
    }
}

/// Two-level classification of a readmission ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioClass {
    /// ratio >= 1 (at least as many readmissions as expected)
    AtOrAbove,
    Below,
}

impl RatioClass {
    pub fn of(ratio: f64) -> Self {
        if ratio >= 1.0 {
            RatioClass::AtOrAbove
        } else {
            RatioClass::Below
        }
    }
}

/// One row of the hospital characteristics dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HospitalRecord {
    pub id: String,
    pub name: String,
    pub state: String,
    pub hospital_type: String,
    pub ownership: Option<String>,
    pub emergency_services: Option<bool>,
    pub overall_rating: Option<OverallRating>,
    /// Present comparison metrics only; missing values are absent
    pub comparisons: BTreeMap<ComparisonMetric, ComparisonCategory>,
    /// (longitude, latitude)
    pub coordinates: Option<(f64, f64)>,
}

/// One (hospital, condition) row of the readmissions dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadmissionMeasurement {
    pub hospital_id: String,
    pub condition: Condition,
    pub expected: Option<f64>,
    pub predicted: Option<f64>,
    pub ratio: Option<f64>,
    pub discharges: Option<f64>,
    pub readmissions: Option<f64>,
}

impl ReadmissionMeasurement {
    pub fn ratio_class(&self) -> Option<RatioClass> {
        self.ratio.map(RatioClass::of)
    }

    /// ratio == predicted / expected within `tolerance`; vacuously true when any is missing
    pub fn ratio_is_consistent(&self, tolerance: f64) -> bool {
        match (self.ratio, self.predicted, self.expected) {
            (Some(ratio), Some(predicted), Some(expected)) if expected != 0.0 => {
                (ratio - predicted / expected).abs() <= tolerance
            }
            _ => true,
        }
    }
}
