//! JSON conflict report generator (§6 output contract).
//!
//! The shape is a mapping `conflict_id -> {"conflicts": [[spdx,...],...], <spdx>: [node_label,...]}`:
//! one entry per minted [`ConflictId`], listing the structural pattern that
//! triggered it plus, for every SPDX id appearing in the pattern, which node
//! labels surfaced that id. An annotated copy of the project graph (per-node
//! `conflict_id`, `conflict_group`, `outbound`, `before_check`) rides alongside,
//! mirroring the teacher's `JsonReporter` practice of one top-level struct per
//! report plus a `ToolInfo`/metadata header.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::project::{ConflictId, ProjectGraph};

use super::ReportError;

/// One entry in the conflict mapping: the minimal conflict pattern plus,
/// for every SPDX id it names, the node labels where that id was observed.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictEntry {
    pub conflicts: Vec<Vec<String>>,
    #[serde(flatten)]
    pub offenders: BTreeMap<String, Vec<String>>,
}

/// JSON report generator for the conflict-id mapping and annotated graph.
pub struct ConflictReporter {
    pretty: bool,
}

impl ConflictReporter {
    #[must_use]
    pub const fn new() -> Self {
        Self { pretty: true }
    }

    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Build the `conflict_id -> ConflictEntry` mapping from a graph that has
    /// already been through [`ProjectGraph::propagate_and_check`].
    #[must_use]
    pub fn conflict_mapping(graph: &ProjectGraph) -> BTreeMap<String, ConflictEntry> {
        let mut offenders_by_id: BTreeMap<ConflictId, BTreeMap<String, Vec<String>>> = BTreeMap::new();
        let mut patterns_by_id: BTreeMap<ConflictId, Vec<Vec<String>>> = BTreeMap::new();

        for node_id in graph.node_ids() {
            let Some(state) = graph.node_state(node_id) else { continue };
            let Some(descriptor) = &state.conflict else { continue };

            patterns_by_id
                .entry(descriptor.id)
                .or_insert_with(|| descriptor.conflicts.clone());

            let offenders = offenders_by_id.entry(descriptor.id).or_default();
            for spdx_set in &descriptor.conflicts {
                for spdx in spdx_set {
                    let entry = offenders.entry(spdx.clone()).or_default();
                    if !entry.iter().any(|n| n == node_id) {
                        entry.push(node_id.to_string());
                    }
                }
            }
        }

        patterns_by_id
            .into_iter()
            .map(|(id, conflicts)| {
                let offenders = offenders_by_id.remove(&id).unwrap_or_default();
                (id.0.to_string(), ConflictEntry { conflicts, offenders })
            })
            .collect()
    }

    /// Render the `conflict_id -> ConflictEntry` mapping alone.
    pub fn generate_conflict_report(&self, graph: &ProjectGraph) -> Result<String, ReportError> {
        let mapping = Self::conflict_mapping(graph);
        self.to_json(&mapping)
    }

    /// Render the annotated project graph: one entry per node with its
    /// computed `conflict_id`/`conflict_group`/`outbound`/`before_check`.
    pub fn generate_annotated_graph(&self, graph: &ProjectGraph) -> Result<String, ReportError> {
        let nodes: BTreeMap<&str, _> = graph
            .node_ids()
            .filter_map(|id| graph.node_state(id).map(|state| (id, state)))
            .collect();
        self.to_json(&nodes)
    }

    fn to_json<T: Serialize>(&self, value: &T) -> Result<String, ReportError> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
        .map_err(|e| ReportError::SerializationError(e.to_string()))?;
        Ok(json)
    }
}

impl Default for ConflictReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{ProjectGraphInput, RawEdge, RawNode};
    use crate::config::Config;
    use crate::inference::{Compatibility, CompatibilityGraph};
    use crate::spdx::DualLicense;

    fn license(spdx: &str) -> DualLicense {
        DualLicense::single(crate::spdx::DualUnit::new(spdx))
    }

    #[test]
    fn conflict_mapping_lists_offending_nodes_by_spdx() {
        let input = ProjectGraphInput {
            nodes: vec![
                RawNode { id: "left".into(), node_type: None, licenses: Some(license("GPL-2.0-only")) },
                RawNode { id: "right".into(), node_type: None, licenses: Some(license("Apache-2.0")) },
                RawNode { id: "parent".into(), node_type: Some("static_link".into()), licenses: None },
            ],
            edges: vec![
                RawEdge { parent: "parent".into(), child: "left".into() },
                RawEdge { parent: "parent".into(), child: "right".into() },
            ],
        };
        let mut graph = ProjectGraph::from_input(input);
        let mut config = Config::default();
        config
            .literal_mapping
            .insert("static_link".to_string(), "STATIC_LINKING".to_string());
        config.license_spread.spread_conditions.push("DEFAULT".to_string());
        let mut compat = CompatibilityGraph::new();
        compat.set("GPL-2.0-only", "Apache-2.0", Compatibility::Incompatible);
        compat.set("Apache-2.0", "GPL-2.0-only", Compatibility::Incompatible);
        graph.propagate_and_check(&config, &compat, true).unwrap();

        let mapping = ConflictReporter::conflict_mapping(&graph);
        assert_eq!(mapping.len(), 1);
        let entry = mapping.values().next().unwrap();
        assert_eq!(entry.conflicts.len(), 1);
        assert!(entry.offenders.contains_key("GPL-2.0-only"));
        assert!(entry.offenders.contains_key("Apache-2.0"));
    }
}
