//! Report generation for a checked project graph (§6 external interfaces).
//!
//! Two output formats: JSON (the `conflict_id -> {"conflicts": ..., <spdx>:
//! [node_label, ...]}` mapping plus the annotated project graph) and a
//! compact human-readable summary for terminal use. Mirrors the teacher
//! crate's `reports` module shape (one submodule per format, a shared
//! `ReportGenerator` trait, a `create_reporter` factory) without the
//! SBOM-diff-specific formats (SARIF, HTML, CSV, side-by-side) this system
//! has no use for.

mod conflicts;
mod json;
mod summary;
mod types;

pub use conflicts::ConflictEntry;
pub use json::JsonReporter;
pub use summary::SummaryReporter;
pub use types::ReportFormat;

use crate::project::ProjectGraph;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Trait for report generators over a checked [`ProjectGraph`].
pub trait ReportGenerator {
    /// Generate a report from a project graph that has already been through
    /// [`ProjectGraph::propagate_and_check`].
    fn generate_report(&self, graph: &ProjectGraph) -> Result<String, ReportError>;

    /// The format this generator produces.
    fn format(&self) -> ReportFormat;
}

/// Create a report generator for the given format, with color control for
/// the summary format.
#[must_use]
pub fn create_reporter(format: ReportFormat, use_color: bool) -> Box<dyn ReportGenerator> {
    match format {
        ReportFormat::Json => Box::new(JsonReporter::new()),
        ReportFormat::Summary => {
            if use_color {
                Box::new(SummaryReporter::new())
            } else {
                Box::new(SummaryReporter::new().no_color())
            }
        }
    }
}
