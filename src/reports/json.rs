//! JSON report generator: conflict-id mapping plus annotated project graph.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::project::{NodeState, ProjectGraph};

use super::conflicts::{ConflictEntry, ConflictReporter};
use super::{ReportError, ReportFormat, ReportGenerator};

#[derive(Serialize)]
struct JsonReport<'a> {
    conflicts: BTreeMap<String, ConflictEntry>,
    graph: BTreeMap<&'a str, &'a NodeState>,
}

/// JSON report generator (§6 output contract).
pub struct JsonReporter {
    pretty: bool,
}

impl JsonReporter {
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: true }
    }

    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for JsonReporter {
    fn generate_report(&self, graph: &ProjectGraph) -> Result<String, ReportError> {
        let conflicts = ConflictReporter::conflict_mapping(graph);
        let nodes: BTreeMap<&str, _> = graph
            .node_ids()
            .filter_map(|id| graph.node_state(id).map(|state| (id, state)))
            .collect();

        let report = JsonReport { conflicts, graph: nodes };

        let json = if self.pretty {
            serde_json::to_string_pretty(&report)
        } else {
            serde_json::to_string(&report)
        }
        .map_err(|e| ReportError::SerializationError(e.to_string()))?;

        Ok(json)
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }
}
