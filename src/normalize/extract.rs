//! Typed extraction from normalized tables
//!
//! Reads the normalized column contract row by row into `HospitalRecord` and
//! `ReadmissionMeasurement` values. Keys must be unique.

use super::tokens::{parse_flag, TokenTable};
use crate::config::columns::*;
use crate::error::AnalysisError;
use crate::model::{ComparisonMetric, Condition, HospitalRecord, ReadmissionMeasurement};
use polars::prelude::*;
use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

const HOSPITAL_DATA: &str = "hospitals";
const READMISSION_DATA: &str = "readmissions";

/// Extract hospital records from a normalized hospital table
///
/// Rows without an identifier cannot be keyed and are skipped.
pub fn extract_hospitals(
    df: &DataFrame,
    tokens: &TokenTable,
) -> Result<Vec<HospitalRecord>, AnalysisError> {
    let ids = text_column(df, HOSPITAL_DATA, HOSPITAL_ID)?;
    let names = text_column(df, HOSPITAL_DATA, HOSPITAL_NAME)?;
    let states = text_column(df, HOSPITAL_DATA, STATE)?;
    let types = text_column(df, HOSPITAL_DATA, HOSPITAL_TYPE)?;
    let ownership = text_column(df, HOSPITAL_DATA, OWNERSHIP)?;
    let emergency = text_column(df, HOSPITAL_DATA, EMERGENCY_SERVICES)?;
    let ratings = text_column(df, HOSPITAL_DATA, OVERALL_RATING)?;

    let comparison_columns = ComparisonMetric::ALL
        .iter()
        .map(|metric| Ok((*metric, text_column(df, HOSPITAL_DATA, metric.column())?)))
        .collect::<Result<Vec<_>, AnalysisError>>()?;

    // Location is optional in the contract
    let locations = match df.column(LOCATION) {
        Ok(_) => Some(text_column(df, HOSPITAL_DATA, LOCATION)?),
        Err(_) => None,
    };

    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0usize;

    for idx in 0..df.height() {
        let Some(id) = ids.get(idx) else {
            skipped += 1;
            continue;
        };
        if !seen.insert(id) {
            return Err(AnalysisError::DuplicateKey {
                dataset: HOSPITAL_DATA.to_string(),
                key: id.to_string(),
            });
        }

        let comparisons: BTreeMap<ComparisonMetric, _> = comparison_columns
            .iter()
            .filter_map(|(metric, values)| {
                values
                    .get(idx)
                    .and_then(|raw| tokens.comparison(raw))
                    .map(|category| (*metric, category))
            })
            .collect();

        records.push(HospitalRecord {
            id: id.to_string(),
            name: names.get(idx).unwrap_or_default().to_string(),
            state: states.get(idx).unwrap_or_default().to_string(),
            hospital_type: types.get(idx).unwrap_or_default().to_string(),
            ownership: ownership.get(idx).map(str::to_string),
            emergency_services: emergency.get(idx).and_then(parse_flag),
            overall_rating: ratings.get(idx).and_then(|raw| tokens.rating(raw)),
            comparisons,
            coordinates: locations
                .and_then(|values| values.get(idx))
                .and_then(parse_coordinates),
        });
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} hospital rows without an identifier", skipped);
    }

    Ok(records)
}

/// Extract readmission measurements from a normalized readmissions table
///
/// Rows without a hospital identifier or with a measure outside the six
/// program conditions are skipped.
pub fn extract_measurements(df: &DataFrame) -> Result<Vec<ReadmissionMeasurement>, AnalysisError> {
    let ids = text_column(df, READMISSION_DATA, HOSPITAL_ID)?;
    let conditions = text_column(df, READMISSION_DATA, CONDITION)?;
    let expected = numeric_column(df, READMISSION_DATA, EXPECTED)?;
    let predicted = numeric_column(df, READMISSION_DATA, PREDICTED)?;
    let ratio = numeric_column(df, READMISSION_DATA, RATIO)?;
    let discharges = numeric_column(df, READMISSION_DATA, DISCHARGES)?;
    let readmissions = numeric_column(df, READMISSION_DATA, READMISSIONS)?;

    let mut seen: FxHashSet<(&str, Condition)> = FxHashSet::default();
    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0usize;

    for idx in 0..df.height() {
        let (Some(id), Some(condition)) = (
            ids.get(idx),
            conditions.get(idx).and_then(Condition::from_code),
        ) else {
            skipped += 1;
            continue;
        };

        if !seen.insert((id, condition)) {
            return Err(AnalysisError::DuplicateKey {
                dataset: READMISSION_DATA.to_string(),
                key: format!("{} / {}", id, condition),
            });
        }

        records.push(ReadmissionMeasurement {
            hospital_id: id.to_string(),
            condition,
            expected: expected.get(idx),
            predicted: predicted.get(idx),
            ratio: ratio.get(idx),
            discharges: discharges.get(idx),
            readmissions: readmissions.get(idx),
        });
    }

    if skipped > 0 {
        tracing::warn!(
            "Skipped {} readmission rows without an identifier or program condition",
            skipped
        );
    }

    Ok(records)
}

/// Parse a coordinate pair: JSON `[lon, lat]` or WKT `POINT (lon lat)`
pub fn parse_coordinates(raw: &str) -> Option<(f64, f64)> {
    let trimmed = raw.trim();

    if let Some(rest) = trimmed.strip_prefix("POINT") {
        let inner = rest.trim().strip_prefix('(')?.strip_suffix(')')?;
        let mut parts = inner.split_whitespace().map(str::parse::<f64>);
        let lon = parts.next()?.ok()?;
        let lat = parts.next()?.ok()?;
        if parts.next().is_some() {
            return None;
        }
        return Some((lon, lat));
    }

    let pair: Vec<f64> = serde_json::from_str(trimmed).ok()?;
    match pair.as_slice() {
        [lon, lat] => Some((*lon, *lat)),
        _ => None,
    }
}

fn text_column<'a>(
    df: &'a DataFrame,
    dataset: &str,
    name: &str,
) -> Result<&'a StringChunked, AnalysisError> {
    let column = df
        .column(name)
        .map_err(|_| AnalysisError::schema(dataset, name, "is missing"))?;
    column.str().map_err(|_| {
        AnalysisError::schema(dataset, name, &format!("has type {}, expected text", column.dtype()))
    })
}

fn numeric_column<'a>(
    df: &'a DataFrame,
    dataset: &str,
    name: &str,
) -> Result<&'a Float64Chunked, AnalysisError> {
    let column = df
        .column(name)
        .map_err(|_| AnalysisError::schema(dataset, name, "is missing"))?;
    column.f64().map_err(|_| {
        AnalysisError::schema(dataset, name, &format!("has type {}, expected Float64", column.dtype()))
    })
}
