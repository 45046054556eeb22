//! Dataset collaborators
//!
//! The pipeline core never touches the filesystem. It asks a `DatasetSource`
//! for the two raw tables and hands normalized tables to a `DatasetSink`.
//! `CsvDatasetStore` implements both over local files: CSV in, Parquet
//! snapshots out.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Default file names inside a data directory
pub const HOSPITALS_FILE: &str = "hospital_general_information.csv";
pub const READMISSIONS_FILE: &str = "hospital_readmissions.csv";

/// Provides the two raw input tables
pub trait DatasetSource {
    fn load_hospitals(&self) -> Result<DataFrame>;
    fn load_readmissions(&self) -> Result<DataFrame>;
}

/// Persists intermediate tables
pub trait DatasetSink {
    fn persist(&self, name: &str, df: &DataFrame) -> Result<()>;
}

/// Local CSV inputs with optional Parquet snapshot directory
#[derive(Debug, Clone)]
pub struct CsvDatasetStore {
    hospitals: PathBuf,
    readmissions: PathBuf,
    snapshot_dir: Option<PathBuf>,
}

impl CsvDatasetStore {
    pub fn new(hospitals: impl Into<PathBuf>, readmissions: impl Into<PathBuf>) -> Self {
        Self {
            hospitals: hospitals.into(),
            readmissions: readmissions.into(),
            snapshot_dir: None,
        }
    }

    /// Both inputs under `dir` with their default file names
    pub fn from_data_dir(dir: &Path) -> Self {
        Self::new(dir.join(HOSPITALS_FILE), dir.join(READMISSIONS_FILE))
    }

    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    /// Read every column as text; typing happens during normalization
    ///
    /// Schema inference would turn identifiers like "010001" into integers.
    fn load_csv(path: &Path) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
            .finish()
            .with_context(|| format!("Failed to load CSV: {:?}", path))?;

        tracing::info!("Loaded {:?}: {} rows x {} columns", path, df.height(), df.width());
        Ok(df)
    }
}

impl DatasetSource for CsvDatasetStore {
    fn load_hospitals(&self) -> Result<DataFrame> {
        Self::load_csv(&self.hospitals)
    }

    fn load_readmissions(&self) -> Result<DataFrame> {
        Self::load_csv(&self.readmissions)
    }
}

impl DatasetSink for CsvDatasetStore {
    fn persist(&self, name: &str, df: &DataFrame) -> Result<()> {
        let Some(dir) = &self.snapshot_dir else {
            tracing::debug!("No snapshot directory configured, skipping '{}'", name);
            return Ok(());
        };

        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create snapshot directory: {:?}", dir))?;
        let path = dir.join(format!("{}.parquet", name));
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create snapshot: {:?}", path))?;

        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Zstd(None))
            .finish(&mut df.clone())
            .with_context(|| format!("Failed to write snapshot: {:?}", path))?;

        tracing::info!("Snapshot written: {:?} ({} rows)", path, df.height());
        Ok(())
    }
}

/// Tables already in memory
#[derive(Debug, Clone)]
pub struct FrameSource {
    pub hospitals: DataFrame,
    pub readmissions: DataFrame,
}

impl DatasetSource for FrameSource {
    fn load_hospitals(&self) -> Result<DataFrame> {
        Ok(self.hospitals.clone())
    }

    fn load_readmissions(&self) -> Result<DataFrame> {
        Ok(self.readmissions.clone())
    }
}

/// Sink that keeps nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DatasetSink for NullSink {
    fn persist(&self, _name: &str, _df: &DataFrame) -> Result<()> {
        Ok(())
    }
}
