//! Pipeline configuration
//!
//! Column contracts, sentinel tokens, join filters and analysis switches.
//! `Default` reproduces the published CMS column names; a JSON file can
//! override any section.

use crate::derive::GroupingField;
use crate::geo::{ClassificationScheme, GeoField};
use crate::stats::levene::LeveneCenter;
use crate::stats::normality::NormalityTest;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Normalized column names the typed extraction reads
pub mod columns {
    pub const HOSPITAL_ID: &str = "hospital_id";
    pub const HOSPITAL_NAME: &str = "hospital_name";
    pub const STATE: &str = "state";
    pub const HOSPITAL_TYPE: &str = "hospital_type";
    pub const OWNERSHIP: &str = "ownership";
    pub const EMERGENCY_SERVICES: &str = "emergency_services";
    pub const OVERALL_RATING: &str = "overall_rating";
    pub const LOCATION: &str = "location";

    pub const CONDITION: &str = "condition";
    pub const DISCHARGES: &str = "discharges";
    pub const RATIO: &str = "ratio";
    pub const PREDICTED: &str = "predicted";
    pub const EXPECTED: &str = "expected";
    pub const READMISSIONS: &str = "readmissions";
}

/// Raw column → normalized column
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnRename {
    pub raw: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub required: bool,
}

impl ColumnRename {
    fn required(raw: &str, name: &str) -> Self {
        Self { raw: raw.to_string(), name: name.to_string(), required: true }
    }

    fn optional(raw: &str, name: &str) -> Self {
        Self { raw: raw.to_string(), name: name.to_string(), required: false }
    }
}

/// Column contract of one input dataset (all names after renaming)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetSchema {
    pub dataset: String,
    pub columns: Vec<ColumnRename>,
    /// Coerced to String (identifiers keep leading zeros)
    #[serde(default)]
    pub text_columns: Vec<String>,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    /// Ordered categorical with levels "1".."5"
    #[serde(default)]
    pub rating_columns: Vec<String>,
    /// Ordered categorical with Above / Same / Below levels
    #[serde(default)]
    pub comparison_columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchemaConfig {
    /// Tokens replaced by missing in every string column (exact match)
    pub sentinels: Vec<String>,
    pub hospitals: DatasetSchema,
    pub readmissions: DatasetSchema,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        use columns::*;
        use crate::model::ComparisonMetric;

        let mut hospital_columns = vec![
            ColumnRename::required("Facility ID", HOSPITAL_ID),
            ColumnRename::required("Facility Name", HOSPITAL_NAME),
            ColumnRename::required("State", STATE),
            ColumnRename::required("Hospital Type", HOSPITAL_TYPE),
            ColumnRename::required("Hospital Ownership", OWNERSHIP),
            ColumnRename::required("Emergency Services", EMERGENCY_SERVICES),
            ColumnRename::required("Hospital overall rating", OVERALL_RATING),
        ];
        let comparison_raw = [
            "Mortality national comparison",
            "Safety of care national comparison",
            "Readmission national comparison",
            "Patient experience national comparison",
            "Effectiveness of care national comparison",
            "Timeliness of care national comparison",
            "Efficient use of medical imaging national comparison",
        ];
        for (raw, metric) in comparison_raw.iter().zip(ComparisonMetric::ALL) {
            hospital_columns.push(ColumnRename::required(raw, metric.column()));
        }
        hospital_columns.push(ColumnRename::optional("Location", LOCATION));

        let hospitals = DatasetSchema {
            dataset: "hospitals".to_string(),
            columns: hospital_columns,
            text_columns: vec![HOSPITAL_ID.to_string(), STATE.to_string()],
            numeric_columns: Vec::new(),
            rating_columns: vec![OVERALL_RATING.to_string()],
            comparison_columns: ComparisonMetric::ALL
                .iter()
                .map(|m| m.column().to_string())
                .collect(),
        };

        let readmissions = DatasetSchema {
            dataset: "readmissions".to_string(),
            columns: vec![
                ColumnRename::required("Facility ID", HOSPITAL_ID),
                ColumnRename::required("Measure Name", CONDITION),
                ColumnRename::required("Number of Discharges", DISCHARGES),
                ColumnRename::required("Excess Readmission Ratio", RATIO),
                ColumnRename::required("Predicted Readmission Rate", PREDICTED),
                ColumnRename::required("Expected Readmission Rate", EXPECTED),
                ColumnRename::required("Number of Readmissions", READMISSIONS),
            ],
            text_columns: vec![HOSPITAL_ID.to_string(), CONDITION.to_string()],
            numeric_columns: vec![
                DISCHARGES.to_string(),
                RATIO.to_string(),
                PREDICTED.to_string(),
                EXPECTED.to_string(),
                READMISSIONS.to_string(),
            ],
            rating_columns: Vec::new(),
            comparison_columns: Vec::new(),
        };

        Self {
            sentinels: vec!["Not Available".to_string()],
            hospitals,
            readmissions,
        }
    }
}

/// Post-join filters, each independently toggleable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JoinFilters {
    pub restrict_to_type: bool,
    pub exclude_state: bool,
    pub drop_missing_key: bool,
    pub drop_missing_ratio: bool,
}

impl Default for JoinFilters {
    fn default() -> Self {
        Self {
            restrict_to_type: true,
            exclude_state: true,
            drop_missing_key: true,
            drop_missing_ratio: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JoinConfig {
    /// Hospital type subject to the penalty program
    pub monitored_type: String,
    /// State exempt from the penalty program
    pub excluded_state: String,
    pub filters: JoinFilters,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            monitored_type: "Acute Care Hospitals".to_string(),
            excluded_state: "MD".to_string(),
            filters: JoinFilters::default(),
        }
    }
}

/// Grouping fields of the derived tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeriveConfig {
    pub share_grouping: GroupingField,
    pub distribution_grouping: GroupingField,
}

impl Default for DeriveConfig {
    fn default() -> Self {
        Self {
            share_grouping: GroupingField::Status,
            distribution_grouping: GroupingField::OverallRating,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Significance threshold for the comparison test and post-hoc summary
    pub alpha: f64,
    pub levene_center: LeveneCenter,
    pub normality_tests: Vec<NormalityTest>,
    pub posthoc: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            levene_center: LeveneCenter::Median,
            normality_tests: vec![NormalityTest::KolmogorovSmirnov],
            posthoc: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeoConfig {
    pub scheme: ClassificationScheme,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            scheme: ClassificationScheme::Quantile { field: GeoField::MeanRatio, buckets: 5 },
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub schema: SchemaConfig,
    pub join: JoinConfig,
    pub derive: DeriveConfig,
    pub analysis: AnalysisConfig,
    pub geo: GeoConfig,
}

impl PipelineConfig {
    /// Load configuration from a JSON file; omitted sections keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config: {:?}", path))?;

        let config: PipelineConfig = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse pipeline config JSON")?;

        let alpha = config.analysis.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            anyhow::bail!("alpha must lie in (0, 1), got {}", alpha);
        }

        Ok(config)
    }
}

fn default_true() -> bool {
    true
}
