//! Report type definitions.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output format for the `check` report (§6).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, JsonSchema)]
pub enum ReportFormat {
    /// Structured JSON: conflict-id mapping plus annotated project graph.
    #[default]
    Json,
    /// Brief human-readable summary for terminal use.
    Summary,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Summary => write!(f, "summary"),
        }
    }
}

impl From<crate::config::OutputFormat> for ReportFormat {
    fn from(format: crate::config::OutputFormat) -> Self {
        match format {
            crate::config::OutputFormat::Json => ReportFormat::Json,
            crate::config::OutputFormat::Summary => ReportFormat::Summary,
        }
    }
}
