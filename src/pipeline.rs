//! Pipeline coordinator
//!
//! raw tables → normalize → join → derive → {variance → post-hoc, geo}
//!
//! `run` does the collaborator calls (load, persist) and then hands typed
//! records to `analyze`, which is pure. Normalization errors abort the run;
//! statistical failures stay inside the report.

use crate::analysis::{PosthocOutcome, PosthocSummarizer, VarianceAnalyzer, VarianceReport};
use crate::config::PipelineConfig;
use crate::data::{DatasetSink, DatasetSource};
use crate::derive::{
    category_shares, condition_ratio_classes, pivot_conditions, ratio_distribution, summarize_hospitals,
    CategoryShare, ConditionRatioClasses, GroupDistribution, HospitalSummary,
};
use crate::error::{AnalysisError, StepOutcome};
use crate::geo::{GeoJoiner, GeoPoint};
use crate::join::{DatasetJoiner, JoinIntegrityWarning};
use crate::model::{HospitalRecord, ReadmissionMeasurement};
use crate::normalize::{extract_hospitals, extract_measurements, SchemaNormalizer};
use anyhow::{Context, Result};
use serde::Serialize;

/// Tolerance of the ratio ≈ predicted / expected check
const RATIO_TOLERANCE: f64 = 1e-3;

/// Everything the output collaborators consume
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub alpha: f64,
    pub hospitals: usize,
    pub measurements: usize,
    pub warnings: Vec<JoinIntegrityWarning>,
    pub summaries: Vec<HospitalSummary>,
    pub ratio_classes: Vec<ConditionRatioClasses>,
    pub shares: Vec<CategoryShare>,
    pub distribution: Vec<GroupDistribution>,
    pub geo: StepOutcome<Vec<GeoPoint>>,
    pub variance: VarianceReport,
    pub posthoc: StepOutcome<Vec<PosthocOutcome>>,
}

pub struct ReadmissionPipeline {
    config: PipelineConfig,
    normalizer: SchemaNormalizer,
    joiner: DatasetJoiner,
}

impl ReadmissionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let normalizer = SchemaNormalizer::new(&config.schema);
        let joiner = DatasetJoiner::new(config.join.clone());
        Self { config, normalizer, joiner }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, normalize, snapshot and analyze
    pub fn run(&self, source: &dyn DatasetSource, sink: &dyn DatasetSink) -> Result<PipelineReport> {
        let (hospitals, measurements) = self.load_records(source, sink)?;
        self.analyze(&hospitals, &measurements)
            .with_context(|| "Analysis failed")
    }

    /// Normalized, typed records from the source
    pub fn load_records(
        &self,
        source: &dyn DatasetSource,
        sink: &dyn DatasetSink,
    ) -> Result<(Vec<HospitalRecord>, Vec<ReadmissionMeasurement>)> {
        let schema = &self.config.schema;

        // STEP 1: normalize both tables
        let raw_hospitals = source.load_hospitals().with_context(|| "Failed to load hospitals")?;
        let hospitals_df = self.normalizer.normalize(&raw_hospitals, &schema.hospitals)?;

        let raw_readmissions = source
            .load_readmissions()
            .with_context(|| "Failed to load readmissions")?;
        let readmissions_df = self.normalizer.normalize(&raw_readmissions, &schema.readmissions)?;

        sink.persist("hospitals_normalized", &hospitals_df)?;
        sink.persist("readmissions_normalized", &readmissions_df)?;

        // STEP 2: typed records
        let hospitals = extract_hospitals(&hospitals_df, self.normalizer.tokens())?;
        let measurements = extract_measurements(&readmissions_df)?;
        tracing::info!(
            "Normalized {} hospitals and {} readmission measurements",
            hospitals.len(),
            measurements.len()
        );

        let inconsistent = measurements
            .iter()
            .filter(|m| !m.ratio_is_consistent(RATIO_TOLERANCE))
            .count();
        if inconsistent > 0 {
            tracing::warn!(
                "{} measurements have a ratio that differs from predicted/expected",
                inconsistent
            );
        }

        Ok((hospitals, measurements))
    }

    /// Join, derive and run the statistics over typed records
    pub fn analyze(
        &self,
        hospitals: &[HospitalRecord],
        measurements: &[ReadmissionMeasurement],
    ) -> Result<PipelineReport, AnalysisError> {
        // STEP 3: join views
        let summary_view = self.joiner.summary_view(hospitals, measurements);
        let analysis_view = self.joiner.analysis_view(hospitals, measurements);
        for warning in &summary_view.warnings {
            tracing::debug!("Join integrity: {:?}", warning);
        }

        // STEP 4: derived tables
        let table = pivot_conditions(&summary_view.rows)?;
        let summaries = summarize_hospitals(&table, &summary_view.rows);
        let ratio_classes = condition_ratio_classes(&summary_view.rows);
        let classified = self.joiner.classify(hospitals);
        let shares = category_shares(&classified, self.config.derive.share_grouping);
        let distribution = ratio_distribution(&analysis_view.rows, self.config.derive.distribution_grouping);

        let unreported = summaries.iter().filter(|s| !s.has_any_report).count();
        tracing::info!(
            "Derived {} hospital summaries ({} without any reported ratio)",
            summaries.len(),
            unreported
        );

        // STEP 5: geo view
        let geo = GeoJoiner::new(self.config.geo.scheme.clone()).join(&summaries);

        // STEP 6: variance analysis and post-hoc
        let alpha = self.config.analysis.alpha;
        let variance = VarianceAnalyzer::new(self.config.analysis.clone()).analyze(&analysis_view.rows);
        let posthoc = if self.config.analysis.posthoc {
            PosthocSummarizer::new(alpha).summarize(&variance)
        } else {
            Err(AnalysisError::precondition("post-hoc comparisons disabled"))
        };

        Ok(PipelineReport {
            alpha,
            hospitals: hospitals.len(),
            measurements: measurements.len(),
            warnings: summary_view.warnings,
            summaries,
            ratio_classes,
            shares,
            distribution,
            geo,
            variance,
            posthoc,
        })
    }
}
