//! Project-graph propagation & conflict engine (C7).
//!
//! Walks a project dependency DAG in two passes over each weakly-connected
//! component: Pass A propagates outbound licenses bottom-up
//! (reverse-topological, leaves first); Pass B walks the same component
//! top-down (topological) filtering each node's pre-propagation license set
//! against the blacklist and pairwise compatibility, clustering conflicts
//! that share a structural pattern under one conflict id.
//!
//! The graph itself is a hand-rolled adjacency map (teacher's
//! `src/diff/graph.rs` style) rather than a dependency on a general-purpose
//! graph crate — this project never needs more than successor/predecessor
//! lookups and a topological walk.

use std::collections::{BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::checker::CompatibilityChecker;
use crate::config::Config;
use crate::error::{LicCompatError, Result};
use crate::inference::CompatibilityGraph;
use crate::scope::Scope;
use crate::spdx::DualLicense;

/// Raw on-disk project graph shape (§6 external interface).
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectGraphInput {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawNode {
    pub id: String,
    pub node_type: Option<String>,
    #[serde(default)]
    pub licenses: Option<DualLicense>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEdge {
    pub parent: String,
    pub child: String,
}

/// Per-node computed state, written by Pass A/B.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeState {
    pub node_type: Option<String>,
    pub licenses: Option<DualLicense>,
    pub before_check: Option<DualLicense>,
    pub outbound: Option<DualLicense>,
    pub license_isolation: bool,
    pub conflict: Option<ConflictDescriptor>,
    pub conflict_id: Option<ConflictId>,
    pub conflict_group: Vec<ConflictId>,
}

/// A conflict id: a monotone counter keyed on first occurrence of a
/// structurally-equal conflict pattern (not a random UUID, for
/// reproducibility across runs — see `SPEC_FULL.md` §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConflictId(pub u64);

/// A conflict pattern: a frozenset of frozensets of SPDX ids.
pub type ConflictPattern = BTreeSet<BTreeSet<String>>;

#[derive(Debug, Clone, Serialize)]
pub struct ConflictDescriptor {
    pub id: ConflictId,
    pub conflicts: Vec<Vec<String>>,
}

/// Global table mapping conflict patterns to ids, assigned in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ConflictTable {
    ids_by_pattern: IndexMap<ConflictPattern, ConflictId>,
    next: u64,
}

impl ConflictTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_insert(&mut self, pattern: ConflictPattern) -> ConflictId {
        if let Some(id) = self.ids_by_pattern.get(&pattern) {
            return *id;
        }
        let id = ConflictId(self.next);
        self.next += 1;
        self.ids_by_pattern.insert(pattern, id);
        id
    }

    fn pattern_for(&self, id: ConflictId) -> Option<&ConflictPattern> {
        self.ids_by_pattern
            .iter()
            .find(|(_, v)| **v == id)
            .map(|(k, _)| k)
    }

    /// All discovered patterns, in minting order.
    pub fn entries(&self) -> impl Iterator<Item = (&ConflictPattern, &ConflictId)> {
        self.ids_by_pattern.iter()
    }
}

/// A project dependency DAG with hand-rolled adjacency maps.
pub struct ProjectGraph {
    order: Vec<String>,
    successors: HashMap<String, Vec<String>>,
    predecessors: HashMap<String, Vec<String>>,
    state: IndexMap<String, NodeState>,
}

impl ProjectGraph {
    /// Build a graph from the parsed `§6` JSON document, mapping each
    /// node's `node_type` literal to a canonical condition via
    /// `Config.literal_mapping`.
    pub fn from_input(input: ProjectGraphInput) -> Self {
        let mut order = Vec::new();
        let mut successors: HashMap<String, Vec<String>> = HashMap::new();
        let mut predecessors: HashMap<String, Vec<String>> = HashMap::new();
        let mut state = IndexMap::new();

        for node in input.nodes {
            order.push(node.id.clone());
            successors.entry(node.id.clone()).or_default();
            predecessors.entry(node.id.clone()).or_default();
            state.insert(
                node.id.clone(),
                NodeState {
                    node_type: node.node_type,
                    licenses: node.licenses,
                    ..Default::default()
                },
            );
        }

        for edge in input.edges {
            successors.entry(edge.parent.clone()).or_default().push(edge.child.clone());
            predecessors.entry(edge.child.clone()).or_default().push(edge.parent.clone());
        }

        Self {
            order,
            successors,
            predecessors,
            state,
        }
    }

    pub fn node_state(&self, id: &str) -> Option<&NodeState> {
        self.state.get(id)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Weakly-connected components, each a lexicographically-sorted id
    /// list, components themselves ordered by their smallest member id.
    fn weakly_connected_components(&self) -> Vec<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut components = Vec::new();

        for id in &self.order {
            if visited.contains(id.as_str()) {
                continue;
            }
            let mut stack = vec![id.as_str()];
            let mut component = Vec::new();
            visited.insert(id.as_str());

            while let Some(cur) = stack.pop() {
                component.push(cur.to_string());
                for next in self
                    .successors
                    .get(cur)
                    .into_iter()
                    .flatten()
                    .chain(self.predecessors.get(cur).into_iter().flatten())
                {
                    if visited.insert(next.as_str()) {
                        stack.push(next.as_str());
                    }
                }
            }

            component.sort();
            components.push(component);
        }

        components.sort_by(|a, b| a.first().cmp(&b.first()));
        components
    }

    /// Kahn's algorithm restricted to `nodes`, breaking ties
    /// lexicographically for determinism. Errors if `nodes` contains a cycle.
    fn topological_order(&self, nodes: &[String]) -> Result<Vec<String>> {
        let node_set: HashSet<&str> = nodes.iter().map(String::as_str).collect();
        let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.as_str(), 0)).collect();

        for node in nodes {
            for child in self.successors.get(node).into_iter().flatten() {
                if node_set.contains(child.as_str()) {
                    *in_degree.get_mut(child.as_str()).unwrap() += 1;
                }
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(n, _)| *n)
            .collect();

        let mut result = Vec::with_capacity(nodes.len());
        while let Some(&next) = ready.iter().next() {
            ready.remove(next);
            result.push(next.to_string());

            for child in self.successors.get(next).into_iter().flatten() {
                if !node_set.contains(child.as_str()) {
                    continue;
                }
                let deg = in_degree.get_mut(child.as_str()).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    ready.insert(child.as_str());
                }
            }
        }

        if result.len() != nodes.len() {
            let stuck = nodes
                .iter()
                .find(|n| !result.contains(n))
                .cloned()
                .unwrap_or_default();
            return Err(LicCompatError::cycle(stuck));
        }

        Ok(result)
    }

    /// Run Pass A (propagation) then Pass B (conflict detection) over every
    /// weakly-connected component, returning the global conflict table.
    pub fn propagate_and_check(
        &mut self,
        config: &Config,
        compat_graph: &CompatibilityGraph,
        ignore_unk: bool,
    ) -> Result<ConflictTable> {
        let checker = CompatibilityChecker::new(compat_graph);
        let components = self.weakly_connected_components();
        let mut table = ConflictTable::new();

        for component in &components {
            let forward = self.topological_order(component)?;
            let mut reverse = forward.clone();
            reverse.reverse();

            for node_id in &reverse {
                self.propagate_node(node_id, config, &checker);
            }

            for node_id in &forward {
                self.check_node(node_id, config, &checker, ignore_unk, &mut table);
            }
        }

        Ok(table)
    }

    fn propagate_node(&mut self, node_id: &str, config: &Config, checker: &CompatibilityChecker<'_>) {
        let children: Vec<String> = self.successors.get(node_id).cloned().unwrap_or_default();

        let mut current_outbound = self.state[node_id].licenses.clone();
        for child in &children {
            let Some(child_outbound) = self.state[child.as_str()].outbound.clone() else {
                continue;
            };
            current_outbound = Some(match current_outbound {
                Some(existing) => existing.and(&child_outbound),
                None => child_outbound,
            });
        }

        let Some(current_outbound) = current_outbound else {
            return;
        };

        let node_type = self.state[node_id].node_type.clone();
        let condition = node_type
            .as_deref()
            .and_then(|t| config.literal_mapping.get(t).cloned())
            .unwrap_or_default();

        let isolated = config.license_isolations.contains(&condition);

        let entry = self.state.get_mut(node_id).unwrap();
        entry.before_check = Some(current_outbound.clone());
        entry.license_isolation = isolated;

        let conditioned = if condition.is_empty() {
            current_outbound
        } else {
            current_outbound.add_condition(condition.clone())
        };

        let effective = compute_effective_outbound(&conditioned, &condition, config, isolated, checker);
        self.state.get_mut(node_id).unwrap().outbound = Some(effective);
    }

    fn check_node(
        &mut self,
        node_id: &str,
        config: &Config,
        checker: &CompatibilityChecker<'_>,
        ignore_unk: bool,
        table: &mut ConflictTable,
    ) {
        let Some(before_check) = self.state[node_id].before_check.clone() else {
            return;
        };

        let (after_check, conflicts) =
            filter_dual_license(&before_check, &config.blacklist, checker, ignore_unk);

        if after_check.is_truthy() {
            return;
        }
        if conflicts.is_empty() {
            return;
        }

        let predecessors: Vec<String> = self.predecessors.get(node_id).cloned().unwrap_or_default();
        let mut inherited: Vec<ConflictId> = Vec::new();
        let mut known_union: ConflictPattern = BTreeSet::new();

        for pred in &predecessors {
            for id in &self.state[pred.as_str()].conflict_group {
                if let Some(pattern) = table.pattern_for(*id) {
                    if !pattern.is_disjoint(&conflicts) {
                        if !inherited.contains(id) {
                            inherited.push(*id);
                        }
                        known_union.extend(pattern.iter().cloned());
                    }
                }
            }
        }

        let new_pattern: ConflictPattern = conflicts.difference(&known_union).cloned().collect();
        if !new_pattern.is_empty() {
            let id = table.get_or_insert(new_pattern);
            inherited.push(id);
        }

        let primary = inherited.first().copied();
        let conflicts_vec: Vec<Vec<String>> = conflicts
            .iter()
            .map(|group| group.iter().cloned().collect())
            .collect();

        let entry = self.state.get_mut(node_id).unwrap();
        entry.conflict_group = inherited.clone();
        entry.conflict_id = primary;
        entry.conflict = primary.map(|id| ConflictDescriptor {
            id,
            conflicts: conflicts_vec,
        });

        let children: Vec<String> = self.successors.get(node_id).cloned().unwrap_or_default();
        for child in &children {
            let child_outbound = self.state[child.as_str()].outbound.clone();
            if is_conflict_happened(child_outbound.as_ref(), &conflicts) {
                if let Some(id) = primary {
                    self.state.get_mut(child.as_str()).unwrap().conflict_id = Some(id);
                }
            }
        }
    }
}

/// Pass A step 6: drop unknown/isolated units, retain copyleft with
/// condition cleared, retain spreadable-condition units with condition
/// cleared, else drop.
fn compute_effective_outbound(
    dual_lic: &DualLicense,
    condition: &str,
    config: &Config,
    isolated: bool,
    checker: &CompatibilityChecker<'_>,
) -> DualLicense {
    if isolated {
        return DualLicense::empty();
    }

    let default_spread = config.license_spread.spread_conditions.iter().any(|c| c == "DEFAULT");

    let mut groups = Vec::new();
    for group in dual_lic.groups() {
        let mut new_group = crate::spdx::Group::new();
        for unit in group {
            if !checker.is_license_exist(&unit.unit_spdx()) {
                continue;
            }
            if let Some(cond) = &unit.condition {
                if config.license_isolations.contains(cond) {
                    continue;
                }
            }

            let classification = crate::spdx::classify(&unit.spdx_id);
            let spreads = config.license_spread.spread_conditions.iter().any(|c| c == condition)
                && !config
                    .license_spread
                    .non_spread_conditions
                    .iter()
                    .any(|c| c == condition);

            if classification.is_copyleft {
                let mut cleared = unit.clone();
                cleared.condition = None;
                new_group.insert(cleared);
            } else if spreads || default_spread {
                let mut cleared = unit.clone();
                cleared.condition = None;
                new_group.insert(cleared);
            }
        }
        if !new_group.is_empty() {
            groups.push(new_group);
        }
    }

    DualLicense::from_groups(groups)
}

/// Pass B step 1: filter groups against the blacklist and pairwise
/// compatibility, returning the surviving `DualLicense` and discovered
/// conflict patterns.
fn filter_dual_license(
    dual_lic: &DualLicense,
    blacklist: &[String],
    checker: &CompatibilityChecker<'_>,
    ignore_unk: bool,
) -> (DualLicense, ConflictPattern) {
    if !dual_lic.is_truthy() {
        return (DualLicense::empty(), ConflictPattern::new());
    }

    let mut conflicts: ConflictPattern = ConflictPattern::new();
    let mut surviving_groups = Vec::new();

    'group: for group in dual_lic.groups() {
        for unit in group {
            let unit_spdx = unit.unit_spdx();
            if blacklist.contains(&unit_spdx) {
                conflicts.insert(BTreeSet::from([unit_spdx]));
                continue 'group;
            }
        }

        let units: Vec<&crate::spdx::DualUnit> = group
            .iter()
            .filter(|u| checker.is_license_exist(&u.unit_spdx()) || !ignore_unk)
            .collect();

        let mut group_conflicts = false;
        for i in 0..units.len() {
            for j in (i + 1)..units.len() {
                let a = units[i];
                let b = units[j];
                if a.spdx_id == b.spdx_id {
                    continue;
                }

                let (a_spdx, b_spdx) = (a.unit_spdx(), b.unit_spdx());
                let pair_key = BTreeSet::from([a_spdx.clone(), b_spdx.clone()]);
                if conflicts.contains(&pair_key) {
                    group_conflicts = true;
                    continue;
                }

                let scope_a = a.condition.as_ref().map(|c| Scope::single(c.clone()));
                let scope_b = b.condition.as_ref().map(|c| Scope::single(c.clone()));

                if check_pair(checker, &a_spdx, &b_spdx, scope_a.as_ref(), scope_b.as_ref(), ignore_unk) {
                    continue;
                }

                conflicts.insert(pair_key);
                group_conflicts = true;
            }
        }

        if group_conflicts {
            continue 'group;
        }

        surviving_groups.push(group.clone());
    }

    (DualLicense::from_groups(surviving_groups), conflicts)
}

/// Bidirectional pairwise compatibility check (`compatible.py::check_compatiblity`).
fn check_pair(
    checker: &CompatibilityChecker<'_>,
    a: &str,
    b: &str,
    scope_a: Option<&Scope>,
    scope_b: Option<&Scope>,
    ignore_unk: bool,
) -> bool {
    use crate::inference::Compatibility;

    let a_to_b = checker.check_compatibility(a, b, scope_a);
    let b_to_a = checker.check_compatibility(b, a, scope_b);

    let is_compatible = |c: &Compatibility| {
        matches!(c, Compatibility::Unconditional | Compatibility::Conditional(_))
            || (ignore_unk && matches!(c, Compatibility::Unknown))
    };

    is_compatible(&a_to_b) || is_compatible(&b_to_a)
}

/// True iff every surviving group in `dual_lic` still contains at least one
/// SPDX id named in `conflicts`.
fn is_conflict_happened(dual_lic: Option<&DualLicense>, conflicts: &ConflictPattern) -> bool {
    let Some(dual_lic) = dual_lic else {
        return false;
    };
    if !dual_lic.is_truthy() {
        return false;
    }

    let flat: HashSet<&str> = conflicts.iter().flatten().map(String::as_str).collect();

    dual_lic
        .groups()
        .all(|group| group.iter().any(|unit| flat.contains(unit.unit_spdx().as_str())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::inference::{Compatibility, CompatibilityGraph};
    use crate::spdx::DualUnit;

    fn simple_config() -> Config {
        let mut config = Config::default();
        config
            .literal_mapping
            .insert("static_link".to_string(), "STATIC_LINKING".to_string());
        config
            .literal_mapping
            .insert("executable".to_string(), "EXECUTABLE".to_string());
        config.license_isolations.push("EXECUTABLE".to_string());
        config.license_spread.spread_conditions.push("DEFAULT".to_string());
        config
    }

    fn graph_with(mit_apache: Compatibility) -> CompatibilityGraph {
        let mut g = CompatibilityGraph::new();
        g.set("MIT", "Apache-2.0", mit_apache.clone());
        g.set("Apache-2.0", "MIT", mit_apache);
        g
    }

    fn unit(id: &str) -> DualUnit {
        DualUnit::new(id)
    }

    #[test]
    fn mit_only_chain_propagates_cleanly() {
        let input = ProjectGraphInput {
            nodes: vec![
                RawNode {
                    id: "parent".into(),
                    node_type: Some("static_link".into()),
                    licenses: None,
                },
                RawNode {
                    id: "child_a".into(),
                    node_type: Some("static_link".into()),
                    licenses: Some(DualLicense::single(unit("MIT"))),
                },
                RawNode {
                    id: "child_b".into(),
                    node_type: Some("static_link".into()),
                    licenses: Some(DualLicense::single(unit("MIT"))),
                },
            ],
            edges: vec![
                RawEdge {
                    parent: "parent".into(),
                    child: "child_a".into(),
                },
                RawEdge {
                    parent: "parent".into(),
                    child: "child_b".into(),
                },
            ],
        };

        let mut graph = ProjectGraph::from_input(input);
        let config = simple_config();
        let compat = graph_with(Compatibility::Unconditional);

        let table = graph.propagate_and_check(&config, &compat, false).unwrap();
        assert_eq!(table.entries().count(), 0);
        assert!(graph.node_state("parent").unwrap().conflict_id.is_none());
    }

    #[test]
    fn incompatible_siblings_mint_a_conflict() {
        let input = ProjectGraphInput {
            nodes: vec![
                RawNode {
                    id: "parent".into(),
                    node_type: Some("static_link".into()),
                    licenses: None,
                },
                RawNode {
                    id: "child_a".into(),
                    node_type: Some("static_link".into()),
                    licenses: Some(DualLicense::single(unit("GPL-2.0-only"))),
                },
                RawNode {
                    id: "child_b".into(),
                    node_type: Some("static_link".into()),
                    licenses: Some(DualLicense::single(unit("Apache-2.0"))),
                },
            ],
            edges: vec![
                RawEdge {
                    parent: "parent".into(),
                    child: "child_a".into(),
                },
                RawEdge {
                    parent: "parent".into(),
                    child: "child_b".into(),
                },
            ],
        };

        let mut graph = ProjectGraph::from_input(input);
        let mut config = simple_config();
        config.literal_mapping.insert("static_link".into(), "STATIC_LINKING".into());

        let mut compat = CompatibilityGraph::new();
        compat.set("GPL-2.0-only", "Apache-2.0", Compatibility::Incompatible);
        compat.set("Apache-2.0", "GPL-2.0-only", Compatibility::Incompatible);

        let table = graph.propagate_and_check(&config, &compat, false).unwrap();
        assert_eq!(table.entries().count(), 1);
        assert!(graph.node_state("parent").unwrap().conflict_id.is_some());
    }

    #[test]
    fn process_isolation_stops_conflict_propagation_upward() {
        let input = ProjectGraphInput {
            nodes: vec![
                RawNode {
                    id: "root".into(),
                    node_type: Some("executable".into()),
                    licenses: None,
                },
                RawNode {
                    id: "offending_parent".into(),
                    node_type: Some("static_link".into()),
                    licenses: None,
                },
                RawNode {
                    id: "child_a".into(),
                    node_type: Some("static_link".into()),
                    licenses: Some(DualLicense::single(unit("GPL-2.0-only"))),
                },
                RawNode {
                    id: "child_b".into(),
                    node_type: Some("static_link".into()),
                    licenses: Some(DualLicense::single(unit("Apache-2.0"))),
                },
            ],
            edges: vec![
                RawEdge {
                    parent: "root".into(),
                    child: "offending_parent".into(),
                },
                RawEdge {
                    parent: "offending_parent".into(),
                    child: "child_a".into(),
                },
                RawEdge {
                    parent: "offending_parent".into(),
                    child: "child_b".into(),
                },
            ],
        };

        let mut graph = ProjectGraph::from_input(input);
        let config = simple_config();

        let mut compat = CompatibilityGraph::new();
        compat.set("GPL-2.0-only", "Apache-2.0", Compatibility::Incompatible);
        compat.set("Apache-2.0", "GPL-2.0-only", Compatibility::Incompatible);

        graph.propagate_and_check(&config, &compat, false).unwrap();

        assert!(graph.node_state("offending_parent").unwrap().conflict_id.is_some());
        assert!(graph.node_state("root").unwrap().before_check.is_none());
    }
}
