//! Human-readable summary report for terminal use.

use crate::project::ProjectGraph;

use super::conflicts::ConflictReporter;
use super::{ReportError, ReportFormat, ReportGenerator};

/// Apply ANSI color formatting if colored output is enabled.
fn ansi_color(text: &str, color: &str, colored: bool) -> String {
    if colored {
        match color {
            "red" => format!("\x1b[31m{text}\x1b[0m"),
            "green" => format!("\x1b[32m{text}\x1b[0m"),
            "yellow" => format!("\x1b[33m{text}\x1b[0m"),
            "cyan" => format!("\x1b[36m{text}\x1b[0m"),
            "bold" => format!("\x1b[1m{text}\x1b[0m"),
            "dim" => format!("\x1b[2m{text}\x1b[0m"),
            _ => text.to_string(),
        }
    } else {
        text.to_string()
    }
}

/// Compact shell-friendly rendering of a checked project graph.
pub struct SummaryReporter {
    colored: bool,
}

impl SummaryReporter {
    #[must_use]
    pub const fn new() -> Self {
        Self { colored: true }
    }

    #[must_use]
    pub const fn no_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        ansi_color(text, color, self.colored)
    }
}

impl Default for SummaryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for SummaryReporter {
    fn generate_report(&self, graph: &ProjectGraph) -> Result<String, ReportError> {
        let mapping = ConflictReporter::conflict_mapping(graph);
        let mut lines = Vec::new();

        lines.push(self.color("License Compatibility Report", "bold"));
        lines.push(self.color("─".repeat(40).as_str(), "dim"));

        let node_count = graph.node_ids().count();
        lines.push(format!("{}  {}", self.color("Nodes:", "cyan"), node_count));

        if mapping.is_empty() {
            lines.push(format!("{}  {}", self.color("Conflicts:", "cyan"), self.color("none", "green")));
            return Ok(lines.join("\n"));
        }

        lines.push(format!(
            "{}  {}",
            self.color("Conflicts:", "cyan"),
            self.color(&mapping.len().to_string(), "red")
        ));
        lines.push(String::new());

        for (id, entry) in &mapping {
            lines.push(format!("{} {id}", self.color("conflict", "bold")));
            for pattern in &entry.conflicts {
                lines.push(format!("  {} {}", self.color("pattern:", "yellow"), pattern.join(" vs ")));
            }
            for (spdx, nodes) in &entry.offenders {
                lines.push(format!("  {} {} -> {}", self.color("-", "red"), spdx, nodes.join(", ")));
            }
        }

        Ok(lines.join("\n"))
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Summary
    }
}
