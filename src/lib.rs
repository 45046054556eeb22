//! Hospital readmission analysis
//!
//! Pipeline over the CMS hospital information and readmission exports:
//! - `normalize/`: column renames, sentinel tokens, typed records
//! - `join`: hospital ↔ measurement join and program status
//! - `derive/`: condition pivot, comparison shares, ratio distribution
//! - `stats/`: distributions, linear models, Levene, normality, Tukey
//! - `analysis/`: variance analysis and post-hoc summaries
//! - `geo`: coordinate view with colour classes
//! - `pipeline`: coordinator; `report/`: Markdown and JSON output

pub mod analysis;
pub mod config;
pub mod data;
pub mod derive;
pub mod error;
pub mod geo;
pub mod join;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod stats;

// Re-export commonly used types
pub use analysis::{PosthocOutcome, PosthocSummarizer, PosthocSummary, VarianceAnalyzer, VarianceReport};
pub use config::PipelineConfig;
pub use data::{CsvDatasetStore, DatasetSink, DatasetSource, FrameSource, NullSink};
pub use error::{AnalysisError, StepOutcome};
pub use geo::{GeoJoiner, GeoPoint};
pub use join::DatasetJoiner;
pub use model::{Condition, HospitalRecord, HospitalStatus, OverallRating, ReadmissionMeasurement};
pub use normalize::SchemaNormalizer;
pub use pipeline::{PipelineReport, ReadmissionPipeline};
pub use report::{JsonFormatter, MarkdownFormatter, ReportFormat};
