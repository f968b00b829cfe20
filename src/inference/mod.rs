//! Knowledge-graph inference (C5).
//!
//! Runs a fixed rule chain over every ordered pair of licenses, producing a
//! [`CompatibilityGraph`] with exactly one terminal edge per ordered pair.
//! Rules 3 and 4 (relicense / or-later) cannot resolve until every direct
//! edge exists, so they register a [`Callback`] that is drained in FIFO
//! order once the main pass over all pairs completes.

use std::collections::HashSet;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::{LicCompatError, Result};
use crate::features::{ActionFeature, LicenseFeature, Modal, Schema};
use crate::scope::Scope;

/// The terminal verdict recorded on a directed compatibility edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Compatibility {
    Unconditional,
    Conditional(Scope),
    /// Reserved for future rules; never emitted by the current chain (see
    /// the Open Questions resolution in `SPEC_FULL.md` §9).
    PartialIncompatible,
    Incompatible,
    Unknown,
}

impl Compatibility {
    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        matches!(self, Self::Unconditional)
    }
}

/// A directed multi-graph over SPDX ids, collapsed to one terminal edge per
/// ordered pair (later writes replace earlier ones, matching the rule
/// chain's "remove then add" pattern on retraction).
///
/// Serialises as a flat list of edges rather than deriving `Serialize`
/// directly over the `(String, String)`-keyed map: JSON object keys must be
/// strings, and serde_json rejects a tuple key outright.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityGraph {
    edges: IndexMap<(String, String), Compatibility>,
}

#[derive(Serialize, Deserialize)]
struct CompatibilityEdge {
    from: String,
    to: String,
    compatibility: Compatibility,
}

impl Serialize for CompatibilityGraph {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let edges: Vec<CompatibilityEdge> = self
            .edges
            .iter()
            .map(|((from, to), compatibility)| CompatibilityEdge {
                from: from.clone(),
                to: to.clone(),
                compatibility: compatibility.clone(),
            })
            .collect();
        edges.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CompatibilityGraph {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Vec::<CompatibilityEdge>::deserialize(deserializer)?;
        let edges = raw
            .into_iter()
            .map(|edge| ((edge.from, edge.to), edge.compatibility))
            .collect();
        Ok(Self { edges })
    }
}

impl CompatibilityGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, a: &str, b: &str, compat: Compatibility) {
        self.edges.insert((a.to_string(), b.to_string()), compat);
    }

    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<&Compatibility> {
        self.edges.get(&(a.to_string(), b.to_string()))
    }

    #[must_use]
    pub fn is_unconditional(&self, a: &str, b: &str) -> bool {
        self.get(a, b).is_some_and(Compatibility::is_unconditional)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &Compatibility)> {
        self.edges.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RuleId {
    PublicDomain,
    Immutability,
    ExceptRelicense,
    OrLaterRelicense,
    ComplianceRequirement,
    ClauseConflict,
    Default,
    End,
}

#[derive(Debug, Clone)]
enum Callback {
    ExceptRelicense { a: String, b: String },
    OrLaterRelicense { a: String, b: String },
}

/// Drives the rule chain over every ordered license pair and produces the
/// converged compatibility graph.
pub struct InferenceEngine<'a> {
    schema: &'a Schema,
    queue: Vec<Callback>,
}

impl<'a> InferenceEngine<'a> {
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            queue: Vec::new(),
        }
    }

    /// Run the chain over every ordered pair `(a, b)` with `a != b`, then
    /// drain the callback queue. `licenses` must be insertion-ordered for
    /// the resulting graph to be reproducible across runs.
    pub fn infer(&mut self, licenses: &IndexMap<String, LicenseFeature>) -> Result<CompatibilityGraph> {
        let mut graph = CompatibilityGraph::new();

        for a in licenses.values() {
            for b in licenses.values() {
                if a.spdx_id == b.spdx_id {
                    continue;
                }
                self.run_chain(a, b, &mut graph)?;
            }
        }

        while let Some(callback) = if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.remove(0))
        } {
            self.run_callback(callback, licenses, &mut graph);
        }

        Ok(graph)
    }

    fn run_chain(
        &mut self,
        a: &LicenseFeature,
        b: &LicenseFeature,
        graph: &mut CompatibilityGraph,
    ) -> Result<()> {
        let mut current = RuleId::PublicDomain;
        let mut visited = HashSet::new();

        while current != RuleId::End {
            if !visited.insert(current) {
                return Err(LicCompatError::rule_revisited(
                    format!("{current:?}"),
                    a.spdx_id.clone(),
                    b.spdx_id.clone(),
                ));
            }
            current = self.apply_rule(current, a, b, graph);
        }

        Ok(())
    }

    fn apply_rule(
        &mut self,
        rule: RuleId,
        a: &LicenseFeature,
        b: &LicenseFeature,
        graph: &mut CompatibilityGraph,
    ) -> RuleId {
        match rule {
            RuleId::PublicDomain => {
                if a.spdx_id == "public-domain" || b.spdx_id == "public-domain" {
                    graph.set(&a.spdx_id, &b.spdx_id, Compatibility::Unconditional);
                    RuleId::End
                } else {
                    RuleId::Immutability
                }
            }
            RuleId::Immutability => {
                let a_immut = a.features().any(|f| self.schema.is_immutable(&f.name));
                let b_immut = b.features().any(|f| self.schema.is_immutable(&f.name));
                if a_immut || b_immut {
                    graph.set(&a.spdx_id, &b.spdx_id, Compatibility::Incompatible);
                    RuleId::End
                } else {
                    RuleId::ExceptRelicense
                }
            }
            RuleId::ExceptRelicense => {
                if let Some(relicense) = a.relicense() {
                    if !relicense.target.is_empty() {
                        self.queue.push(Callback::ExceptRelicense {
                            a: a.spdx_id.clone(),
                            b: b.spdx_id.clone(),
                        });
                    }
                }
                RuleId::OrLaterRelicense
            }
            RuleId::OrLaterRelicense => {
                if a.spdx_id.contains("or-later") {
                    self.queue.push(Callback::OrLaterRelicense {
                        a: a.spdx_id.clone(),
                        b: b.spdx_id.clone(),
                    });
                }
                RuleId::ComplianceRequirement
            }
            RuleId::ComplianceRequirement => {
                if !check_compliance(self.schema, a, b) || !check_compliance(self.schema, b, a) {
                    graph.set(&a.spdx_id, &b.spdx_id, Compatibility::Incompatible);
                    RuleId::End
                } else {
                    RuleId::ClauseConflict
                }
            }
            RuleId::ClauseConflict => self.clause_conflict(a, b, graph),
            RuleId::Default => {
                graph.set(&a.spdx_id, &b.spdx_id, Compatibility::Unconditional);
                RuleId::End
            }
            RuleId::End => RuleId::End,
        }
    }

    /// Rule 6: for every modal-pair in the schema's conflict matrix, find
    /// common action names between `a` and `b`, solve the escaping scope,
    /// and intersect across all conflicts.
    fn clause_conflict(
        &self,
        a: &LicenseFeature,
        b: &LicenseFeature,
        graph: &mut CompatibilityGraph,
    ) -> RuleId {
        if graph.is_unconditional(&b.spdx_id, &a.spdx_id) {
            graph.set(&a.spdx_id, &b.spdx_id, Compatibility::Unconditional);
            return RuleId::End;
        }

        let mut condition_scope = Scope::universe();
        let mut license_a_scope = Scope::universe();
        let mut conflict_found = false;

        for (modal_a, modal_b) in [
            (Modal::Can, Modal::Cannot),
            (Modal::Cannot, Modal::Can),
            (Modal::Must, Modal::Cannot),
            (Modal::Cannot, Modal::Must),
        ] {
            for name in common_action_names(a, modal_a, b, modal_b) {
                // An empty or absent `conflicts` list means no filtering is
                // applied and the pair is always a conflict candidate; the
                // pair is skipped only when a non-empty list doesn't name it.
                let conflicts = self.schema.conflicts_for(&name);
                if !conflicts.is_empty() && !conflicts.contains(&(modal_a, modal_b)) {
                    continue;
                }

                let feat_a = a.action(modal_a, &name).expect("name came from a's map");
                let feat_b = b.action(modal_b, &name).expect("name came from b's map");

                let conflict_scope = feat_a.scope.intersect(&feat_b.scope);
                if conflict_scope.is_empty() {
                    continue;
                }
                if conflict_scope.is_universal() {
                    graph.set(&a.spdx_id, &b.spdx_id, Compatibility::Incompatible);
                    return RuleId::End;
                }

                let compatible_scope = conflict_scope.negate().intersect(&feat_a.scope);
                if compatible_scope.is_empty() {
                    graph.set(&a.spdx_id, &b.spdx_id, Compatibility::Incompatible);
                    return RuleId::End;
                }

                conflict_found = true;
                condition_scope = condition_scope.intersect(&compatible_scope);
                license_a_scope = license_a_scope
                    .intersect(&feat_a.scope.negate())
                    .intersect(&compatible_scope);
            }
        }

        if !conflict_found {
            graph.set(&a.spdx_id, &b.spdx_id, Compatibility::Unconditional);
            return RuleId::End;
        }

        if condition_scope.is_empty() {
            graph.set(&a.spdx_id, &b.spdx_id, Compatibility::Incompatible);
            return RuleId::End;
        }

        if !license_a_scope.is_empty() {
            graph.set(
                &a.spdx_id,
                &b.spdx_id,
                Compatibility::Conditional(license_a_scope),
            );
        }

        RuleId::End
    }

    fn run_callback(
        &self,
        callback: Callback,
        licenses: &IndexMap<String, LicenseFeature>,
        graph: &mut CompatibilityGraph,
    ) {
        match callback {
            Callback::ExceptRelicense { a, b } => except_relicense_callback(licenses, graph, &a, &b),
            Callback::OrLaterRelicense { a, b } => or_later_callback(licenses, graph, &a, &b),
        }
    }
}

fn common_action_names<'a>(
    a: &'a LicenseFeature,
    modal_a: Modal,
    b: &'a LicenseFeature,
    modal_b: Modal,
) -> Vec<String> {
    let names_a: HashSet<&str> = modal_names(a, modal_a);
    let names_b: HashSet<&str> = modal_names(b, modal_b);
    names_a.intersection(&names_b).map(|s| s.to_string()).collect()
}

fn modal_names(license: &LicenseFeature, modal: Modal) -> HashSet<&str> {
    let map = match modal {
        Modal::Can => &license.can,
        Modal::Cannot => &license.cannot,
        Modal::Must => &license.must,
        Modal::Special => &license.special,
    };
    map.keys().map(String::as_str).collect()
}

/// Rule 5: every compliance-tagged action of `a` must be implied by `b` —
/// `b`'s action-set in each compliance modal must be a subset of `a`'s, and
/// for common actions `b`'s scope must be contained in `a`'s.
fn check_compliance(schema: &Schema, a: &LicenseFeature, b: &LicenseFeature) -> bool {
    let expanded_a = expand_triggering(a);

    for feat_a in expanded_a.features() {
        if !schema.is_compliance(&feat_a.name) {
            continue;
        }

        for modal in [Modal::Can, Modal::Cannot, Modal::Must] {
            let a_actions = modal_names(&expanded_a, modal);
            let b_actions = modal_names(b, modal);

            for key in b_actions.difference(&a_actions) {
                let b_feat = b.action(modal, key).expect("key came from b's map");
                let conflict_scope = b_feat.scope.intersect(&feat_a.scope);
                if !conflict_scope.is_empty() {
                    return false;
                }
            }

            for key in a_actions.intersection(&b_actions) {
                let a_feat = expanded_a
                    .action(modal, key)
                    .expect("key came from a's expanded map");
                let b_feat = b.action(modal, key).expect("key came from b's map");
                if !a_feat.scope.contains(&b_feat.scope) {
                    return false;
                }
            }
        }
    }

    true
}

/// Materialise empty `ActionFeature`s for every `modal.action` pair listed in
/// `special.triggering`, so the compliance check treats them as asserted.
fn expand_triggering(license: &LicenseFeature) -> LicenseFeature {
    let Some(triggering) = license.triggering() else {
        return license.clone();
    };

    let mut expanded = license.clone();
    for entry in &triggering.target {
        let Some((modal_str, action)) = entry.split_once('.') else {
            continue;
        };
        let modal = match modal_str {
            "can" => Modal::Can,
            "cannot" => Modal::Cannot,
            "must" => Modal::Must,
            "special" => Modal::Special,
            _ => continue,
        };
        let feat = ActionFeature {
            name: action.to_string(),
            modal,
            scope: Scope::empty(),
            target: Vec::new(),
        };
        match modal {
            Modal::Can => expanded.can.insert(action.to_string(), feat),
            Modal::Cannot => expanded.cannot.insert(action.to_string(), feat),
            Modal::Must => expanded.must.insert(action.to_string(), feat),
            Modal::Special => expanded.special.insert(action.to_string(), feat),
        };
    }
    expanded
}

fn except_relicense_callback(
    licenses: &IndexMap<String, LicenseFeature>,
    graph: &mut CompatibilityGraph,
    a: &str,
    b: &str,
) {
    if graph.is_unconditional(a, b) {
        return;
    }
    let Some(license_a) = licenses.get(a) else {
        return;
    };
    let Some(relicense) = license_a.relicense() else {
        return;
    };

    for target in &relicense.target {
        if graph.is_unconditional(target, b) {
            graph.set(a, b, Compatibility::Conditional(relicense.scope.clone()));
            return;
        }

        if let Some(Compatibility::Conditional(target_scope)) = graph.get(target, b) {
            let combined = target_scope.intersect(&relicense.scope);
            if !combined.is_empty() {
                graph.set(a, b, Compatibility::Conditional(combined));
            }
        }
    }
}

fn version_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)*)").expect("static regex"))
}

/// Extract the dotted-integer version from an SPDX id, e.g.
/// `GPL-3.0-or-later` -> `Some("3.0")`.
#[must_use]
pub fn extract_version(spdx_id: &str) -> Option<&str> {
    version_pattern().find(spdx_id).map(|m| m.as_str())
}

/// Normalise a dotted-integer version into a comparable vector, stripping
/// trailing zero components (so `"2.0" == "2"`).
#[must_use]
pub fn normalize_version(version: &str) -> Vec<u64> {
    let mut parts: Vec<u64> = version
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();
    while parts.last() == Some(&0) && parts.len() > 1 {
        parts.pop();
    }
    parts
}

fn license_prefix(spdx_id: &str) -> String {
    match extract_version(spdx_id) {
        Some(v) => spdx_id[..spdx_id.find(v).unwrap()].to_string(),
        None => spdx_id.to_string(),
    }
}

/// All ids in `candidates` sharing `spdx_id`'s prefix with a strictly
/// greater normalised version and no `or-later` suffix.
fn find_all_versions<'a>(spdx_id: &str, candidates: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let prefix = license_prefix(spdx_id);
    let current_version = extract_version(spdx_id)
        .map(normalize_version)
        .unwrap_or_default();

    candidates
        .filter(|cand| {
            !cand.contains("or-later")
                && license_prefix(cand) == prefix
                && extract_version(cand).is_some_and(|v| normalize_version(v) > current_version)
        })
        .map(String::as_str)
        .collect()
}

fn or_later_callback(
    licenses: &IndexMap<String, LicenseFeature>,
    graph: &mut CompatibilityGraph,
    a: &str,
    b: &str,
) {
    if graph.is_unconditional(a, b) {
        return;
    }

    let later = find_all_versions(a, licenses.keys());

    for target in later {
        if target == b {
            graph.set(a, b, Compatibility::Unconditional);
            graph.set(b, a, Compatibility::Unconditional);
            continue;
        }

        if graph.is_unconditional(target, b) {
            graph.set(a, b, Compatibility::Unconditional);
        } else if let Some(Compatibility::Conditional(scope)) = graph.get(target, b) {
            graph.set(a, b, Compatibility::Conditional(scope.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mit() -> LicenseFeature {
        LicenseFeature::from_toml_str(
            "MIT",
            r#"
            [can.modify]
            [can.distribute]
            [can.sublicense]
            [must.include_notice]
        "#,
        )
        .unwrap()
    }

    fn gpl2_only() -> LicenseFeature {
        LicenseFeature::from_toml_str(
            "GPL-2.0-only",
            r#"
            [can.modify]
            [can.distribute]
            [must.set_same_license]
            protect_scope = ["DISTRIBUTE"]
            [cannot.sublicense]
        "#,
        )
        .unwrap()
    }

    fn empty_schema() -> Schema {
        Schema::from_toml_str("[actions]\n").unwrap()
    }

    #[test]
    fn public_domain_is_unconditionally_compatible_with_anything() {
        let pd = LicenseFeature::from_toml_str("public-domain", "").unwrap();
        let mit = mit();
        let schema = empty_schema();
        let mut licenses = IndexMap::new();
        licenses.insert(pd.spdx_id.clone(), pd);
        licenses.insert(mit.spdx_id.clone(), mit);

        let mut engine = InferenceEngine::new(&schema);
        let graph = engine.infer(&licenses).unwrap();
        assert!(graph.is_unconditional("public-domain", "MIT"));
        assert!(graph.is_unconditional("MIT", "public-domain"));
    }

    #[test]
    fn no_conflicting_actions_is_unconditional() {
        let a = mit();
        let b = LicenseFeature::from_toml_str("Apache-2.0", "[can.modify]\n[can.distribute]\n").unwrap();
        let schema = empty_schema();
        let mut licenses = IndexMap::new();
        licenses.insert(a.spdx_id.clone(), a);
        licenses.insert(b.spdx_id.clone(), b);

        let mut engine = InferenceEngine::new(&schema);
        let graph = engine.infer(&licenses).unwrap();
        assert!(graph.is_unconditional("MIT", "Apache-2.0"));
    }

    #[test]
    fn version_helpers_compare_correctly() {
        assert_eq!(normalize_version("2.0"), vec![2]);
        assert_eq!(normalize_version("2.1"), vec![2, 1]);
        assert!(normalize_version("3.0") > normalize_version("2.0"));
    }

    #[test]
    fn find_all_versions_excludes_or_later_and_lower_versions() {
        let candidates = vec![
            "GPL-2.0-only".to_string(),
            "GPL-3.0-only".to_string(),
            "GPL-3.0-or-later".to_string(),
        ];
        let later = find_all_versions("GPL-2.0-or-later", candidates.iter());
        assert_eq!(later, vec!["GPL-3.0-only"]);
    }

    #[test]
    fn mutual_cannot_sublicense_vs_can_sublicense_conflicts() {
        let a = mit();
        let b = gpl2_only();
        let schema = empty_schema();
        let mut licenses = IndexMap::new();
        licenses.insert(a.spdx_id.clone(), a);
        licenses.insert(b.spdx_id.clone(), b);

        let mut engine = InferenceEngine::new(&schema);
        let graph = engine.infer(&licenses).unwrap();
        // MIT can.sublicense (universal) vs GPL-2.0-only cannot.sublicense (universal)
        // collapses the whole scope, so MIT -> GPL-2.0-only is incompatible.
        assert_eq!(graph.get("MIT", "GPL-2.0-only"), Some(&Compatibility::Incompatible));
    }
}
