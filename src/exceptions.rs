//! Exception materialisation (§4.6).
//!
//! A project graph may reference a compound identifier `X-with-E` that is
//! not itself a feature file on disk. When `E` is a known exception, we
//! synthesise a license feature for `X-with-E` by *covering* `X` with `E`
//! (same-action entries from `E` override `X`'s) and run the full rule
//! chain for the new id against every already-loaded license before any
//! project traversal begins.

use indexmap::IndexMap;

use crate::checker::CompatibilityChecker;
use crate::features::{LicenseFeature, Schema};
use crate::inference::{CompatibilityGraph, InferenceEngine};
use crate::spdx::DualLicense;

/// Cover `base` with `exception`: same-action entries in `exception`
/// override `base`'s, the rest of `base`'s entries carry through unchanged.
#[must_use]
pub fn cover_from(base: &LicenseFeature, exception: &LicenseFeature, new_spdx_id: impl Into<String>) -> LicenseFeature {
    let mut covered = base.clone();
    covered.spdx_id = new_spdx_id.into();

    for (name, feat) in &exception.can {
        covered.can.insert(name.clone(), feat.clone());
    }
    for (name, feat) in &exception.cannot {
        covered.cannot.insert(name.clone(), feat.clone());
    }
    for (name, feat) in &exception.must {
        covered.must.insert(name.clone(), feat.clone());
    }
    for (name, feat) in &exception.special {
        covered.special.insert(name.clone(), feat.clone());
    }

    covered
}

/// Scan every `licenses: DualLicense` attribute in the supplied iterator for
/// `X-with-E` references not already present in `licenses`/the compatibility
/// graph, synthesise them, and fold the synthesised licenses' compatibility
/// edges into `graph` by re-running inference with them included.
///
/// Returns the (possibly enlarged) license table and refreshed graph, so
/// callers keep a single authoritative copy of both.
pub fn materialize_exceptions<'a>(
    project_licenses: impl Iterator<Item = &'a DualLicense>,
    licenses: IndexMap<String, LicenseFeature>,
    exceptions: &IndexMap<String, LicenseFeature>,
    schema: &Schema,
    mut graph: CompatibilityGraph,
) -> (IndexMap<String, LicenseFeature>, CompatibilityGraph) {
    let mut licenses = licenses;
    let mut visited = std::collections::HashSet::new();
    let mut newly_synthesised = Vec::new();

    for dual_license in project_licenses {
        for group in dual_license.groups() {
            for unit in group {
                for exception_id in &unit.exceptions {
                    let spdx_id = format!("{}-with-{}", unit.spdx_id, exception_id);
                    if !visited.insert(spdx_id.clone()) {
                        continue;
                    }

                    let checker = CompatibilityChecker::new(&graph);
                    if checker.is_license_exist(&spdx_id) {
                        continue;
                    }

                    let Some(exception_feat) = exceptions.get(exception_id) else {
                        continue;
                    };
                    let Some(base_feat) = licenses.get(&unit.spdx_id) else {
                        continue;
                    };

                    let covered = cover_from(base_feat, exception_feat, spdx_id.clone());
                    newly_synthesised.push(covered);
                }
            }
        }
    }

    if newly_synthesised.is_empty() {
        return (licenses, graph);
    }

    for feat in newly_synthesised {
        licenses.insert(feat.spdx_id.clone(), feat);
    }

    let mut engine = InferenceEngine::new(schema);
    graph = engine
        .infer(&licenses)
        .expect("re-inference over an already-validated license table cannot cycle");

    (licenses, graph)
}

/// Rewrite or-later blacklist path edges (`lict/parser/exception.py`'s
/// blacklist pass, §4.6 follow-up used by the CLI's blacklist enforcement):
/// for every edge that literally touches a blacklisted SPDX id, normalize
/// whichever endpoint carries an `-or-later` suffix down to `-only`, look up
/// that `-only`-to-`-only` edge's verdict, and overwrite the original edge
/// with it — so an `-or-later` id can never get more lenient treatment than
/// its `-only` sibling when paired with a blacklisted license.
pub fn rewrite_blacklist_edges(graph: &mut CompatibilityGraph, blacklist: &[String]) {
    if blacklist.is_empty() {
        return;
    }

    for blacklisted in blacklist {
        let touching: Vec<(String, String)> = graph
            .iter()
            .filter(|((src, dst), _)| src == blacklisted || dst == blacklisted)
            .map(|(key, _)| key.clone())
            .collect();

        for (src, dst) in touching {
            let (only_src, only_dst) = if src.contains("-or-later") {
                (src.replace("-or-later", "-only"), dst.clone())
            } else {
                (src.clone(), dst.replace("-or-later", "-only"))
            };

            if let Some(compat) = graph.get(&only_src, &only_dst).cloned() {
                graph.set(&src, &dst, compat);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::Modal;

    #[test]
    fn cover_from_overrides_same_action_entries() {
        let base = LicenseFeature::from_toml_str(
            "GPL-2.0-only",
            r#"
            [must.set_same_license]
        "#,
        )
        .unwrap();

        let exception = LicenseFeature::from_toml_str(
            "Classpath-exception-2.0",
            r#"
            [can.set_same_license]
        "#,
        )
        .unwrap();

        let covered = cover_from(&base, &exception, "GPL-2.0-only-with-Classpath-exception-2.0");
        assert_eq!(covered.spdx_id, "GPL-2.0-only-with-Classpath-exception-2.0");
        assert!(covered.must.get("set_same_license").is_none());
        assert!(covered.action(Modal::Can, "set_same_license").is_some());
    }
}
