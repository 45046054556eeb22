use crate::pipeline::PipelineReport;

/// JSON formatter for pipeline reports
///
/// Failed steps serialize as `{"Err": {...}}` with the error kind and its
/// fields; NaN statistics serialize as `null`.
pub struct JsonFormatter;

impl JsonFormatter {
    /// Pretty-printed JSON
    pub fn format(report: &PipelineReport) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(report)
    }

    /// Compact JSON (no whitespace)
    pub fn format_compact(report: &PipelineReport) -> Result<String, serde_json::Error> {
        serde_json::to_string(report)
    }
}
