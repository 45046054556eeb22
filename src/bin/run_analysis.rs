// Readmission analysis entry point
//
// Usage: cargo run --features cli --bin run_analysis
//
// Environment:
//   DATA_DIR          directory holding both CSV exports (default: data)
//   HOSPITALS_CSV     hospital information CSV (overrides DATA_DIR)
//   READMISSIONS_CSV  readmission measurements CSV (overrides DATA_DIR)
//   PIPELINE_CONFIG   optional JSON config file
//   SNAPSHOT_DIR      optional directory for normalized Parquet snapshots
//   REPORT_FORMAT     markdown (default) or json

use anyhow::{anyhow, Context};
use readmission_anova::{CsvDatasetStore, PipelineConfig, ReadmissionPipeline, ReportFormat};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "readmission_anova=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let data_dir = PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    let mut store = CsvDatasetStore::from_data_dir(&data_dir);
    if let (Ok(hospitals), Ok(readmissions)) = (std::env::var("HOSPITALS_CSV"), std::env::var("READMISSIONS_CSV")) {
        store = CsvDatasetStore::new(hospitals, readmissions);
    }
    if let Ok(dir) = std::env::var("SNAPSHOT_DIR") {
        store = store.with_snapshot_dir(dir);
    }

    let config = match std::env::var("PIPELINE_CONFIG") {
        Ok(path) => PipelineConfig::load(Path::new(&path))?,
        Err(_) => PipelineConfig::default(),
    };

    let format: ReportFormat = std::env::var("REPORT_FORMAT")
        .map(|f| f.parse())
        .unwrap_or(Ok(ReportFormat::Markdown))
        .map_err(|e| anyhow!(e))?;

    tracing::info!("Configuration:");
    tracing::info!("  DATA_DIR: {:?}", data_dir);
    tracing::info!("  alpha: {}", config.analysis.alpha);
    tracing::info!("  format: {:?}", format);

    let start = Instant::now();
    let pipeline = ReadmissionPipeline::new(config);
    let report = pipeline.run(&store, &store)?;
    tracing::info!("Pipeline finished in {:.2?}", start.elapsed());

    let rendered = format.render(&report).context("Failed to render report")?;
    println!("{}", rendered);

    Ok(())
}
