//! Schema normalization
//!
//! Turns a raw input table into the column contract the pipeline expects:
//!
//! 1. Rename mapped columns and prune everything else
//! 2. Coerce key/text columns to String
//! 3. Replace sentinel tokens ("Not Available") with missing
//! 4. Coerce numeric columns to Float64 (missing on parse failure)
//! 5. Map ordered categorical columns onto their canonical level labels
//!
//! A column that already carries its normalized name is accepted in place of
//! its raw name, so normalizing an already-normalized table is a no-op.

pub mod extract;
pub mod tokens;

pub use extract::{extract_hospitals, extract_measurements, parse_coordinates};
pub use tokens::{title_case, TokenTable};

use crate::config::{DatasetSchema, SchemaConfig};
use crate::error::AnalysisError;
use crate::model::OverallRating;
use polars::prelude::*;
use std::collections::HashSet;

/// Applies the configured column contract to raw tables
#[derive(Debug, Clone)]
pub struct SchemaNormalizer {
    tokens: TokenTable,
}

impl SchemaNormalizer {
    pub fn new(config: &SchemaConfig) -> Self {
        Self {
            tokens: TokenTable::new(&config.sentinels),
        }
    }

    pub fn tokens(&self) -> &TokenTable {
        &self.tokens
    }

    /// Normalize one raw table against its dataset schema
    ///
    /// # Errors
    /// `AnalysisError::Schema` when a required column is absent, or when a
    /// designated text/numeric/categorical column is not produced by the
    /// column mapping. No partial output is returned.
    pub fn normalize(
        &self,
        raw: &DataFrame,
        schema: &DatasetSchema,
    ) -> Result<DataFrame, AnalysisError> {
        // ====================================================================
        // STEP 1: Resolve mapped columns (raw name, else normalized name)
        // ====================================================================

        let present: HashSet<String> = raw
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let mut selections = Vec::with_capacity(schema.columns.len());
        let mut produced: HashSet<&str> = HashSet::new();

        for rename in &schema.columns {
            let source = if present.contains(&rename.raw) {
                rename.raw.as_str()
            } else if present.contains(&rename.name) {
                rename.name.as_str()
            } else if rename.required {
                return Err(AnalysisError::schema(
                    &schema.dataset,
                    &rename.raw,
                    &format!("is missing (available: {:?})", sorted(&present)),
                ));
            } else {
                continue;
            };
            selections.push(col(source).alias(rename.name.as_str()));
            produced.insert(rename.name.as_str());
        }

        validate_designated(schema, &produced)?;

        // ====================================================================
        // STEP 2: Prune + rename, text coercion
        // ====================================================================

        let text_casts: Vec<Expr> = schema
            .text_columns
            .iter()
            .chain(&schema.rating_columns)
            .chain(&schema.comparison_columns)
            .filter(|name| produced.contains(name.as_str()))
            .map(|name| col(name.as_str()).cast(DataType::String))
            .collect();

        let renamed = raw
            .clone()
            .lazy()
            .select(&selections)
            .with_columns(text_casts)
            .collect()?;

        // ====================================================================
        // STEP 3 + 4: Sentinels → missing, then numeric coercion
        // ====================================================================

        let sentinel_exprs: Vec<Expr> = renamed
            .get_columns()
            .iter()
            .filter(|c| c.dtype() == &DataType::String)
            .filter_map(|c| self.sentinel_expr(c.name().as_str()))
            .collect();

        let numeric_casts: Vec<Expr> = schema
            .numeric_columns
            .iter()
            .filter(|name| produced.contains(name.as_str()))
            .map(|name| col(name.as_str()).cast(DataType::Float64))
            .collect();

        let mut df = renamed
            .lazy()
            .with_columns(sentinel_exprs)
            .with_columns(numeric_casts)
            .collect()?;

        // ====================================================================
        // STEP 5: Ordered categoricals → canonical labels
        // ====================================================================

        for name in schema.rating_columns.iter().filter(|n| produced.contains(n.as_str())) {
            let mapped: Vec<Option<&'static str>> = text_values(&df, &schema.dataset, name)?
                .into_iter()
                .map(|v| v.and_then(|s| self.tokens.rating(s)).map(OverallRating::label))
                .collect();
            df.with_column(Series::new(name.as_str().into(), mapped))?;
        }

        for name in schema.comparison_columns.iter().filter(|n| produced.contains(n.as_str())) {
            let mapped: Vec<Option<&'static str>> = text_values(&df, &schema.dataset, name)?
                .into_iter()
                .map(|v| v.and_then(|s| self.tokens.comparison(s)).map(|c| c.label()))
                .collect();
            df.with_column(Series::new(name.as_str().into(), mapped))?;
        }

        tracing::debug!(
            "Normalized {}: {} rows × {} columns",
            schema.dataset,
            df.height(),
            df.width()
        );

        Ok(df)
    }

    /// `when(col == s1 | col == s2 ...) then null otherwise col`
    fn sentinel_expr(&self, name: &str) -> Option<Expr> {
        let is_sentinel = self
            .tokens
            .sentinels()
            .map(|token| col(name).eq(lit(token)))
            .reduce(|acc, e| acc.or(e))?;

        Some(
            when(is_sentinel)
                .then(lit(NULL).cast(DataType::String))
                .otherwise(col(name))
                .alias(name),
        )
    }
}

/// Designated columns must be part of the mapping output
fn validate_designated(schema: &DatasetSchema, produced: &HashSet<&str>) -> Result<(), AnalysisError> {
    let optional: HashSet<&str> = schema
        .columns
        .iter()
        .filter(|c| !c.required)
        .map(|c| c.name.as_str())
        .collect();

    let designated = schema
        .text_columns
        .iter()
        .chain(&schema.numeric_columns)
        .chain(&schema.rating_columns)
        .chain(&schema.comparison_columns);

    for name in designated {
        if !produced.contains(name.as_str()) && !optional.contains(name.as_str()) {
            return Err(AnalysisError::schema(
                &schema.dataset,
                name,
                "is designated for coercion but not produced by the column mapping",
            ));
        }
    }
    Ok(())
}

fn text_values<'a>(
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

fn sorted(set: &HashSet<String>) -> Vec<&str> {
    let mut names: Vec<&str> = set.iter().map(String::as_str).collect();
    names.sort_unstable();
    names
}
