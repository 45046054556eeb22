//! Report formatters for a finished pipeline run

pub mod json;
pub mod markdown;

pub use json::JsonFormatter;
pub use markdown::MarkdownFormatter;

use crate::pipeline::PipelineReport;
use std::str::FromStr;

/// Output format selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Markdown,
    Json,
}

impl ReportFormat {
    pub fn render(self, report: &PipelineReport) -> Result<String, serde_json::Error> {
        match self {
            ReportFormat::Markdown => Ok(MarkdownFormatter::format(report)),
            ReportFormat::Json => JsonFormatter::format(report),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}' (expected markdown or json)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("md".parse::<ReportFormat>(), Ok(ReportFormat::Markdown));
        assert_eq!(" JSON ".parse::<ReportFormat>(), Ok(ReportFormat::Json));
        assert!("html".parse::<ReportFormat>().is_err());
    }
}
