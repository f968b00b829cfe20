//! Compatibility checker (C6) — a query service over a converged
//! [`CompatibilityGraph`].
//!
//! The teacher's singleton-style services are global by convention; this
//! checker is deliberately threaded through call sites instead (see the
//! Open Question decision recorded in `SPEC_FULL.md` §9 / `DESIGN.md`) so
//! that propagation over a project graph (C7) can hold its own reference
//! without reaching for global mutable state.

use crate::features::LicenseFeature;
use crate::inference::{Compatibility, CompatibilityGraph};
use crate::scope::Scope;

/// Query service over a converged compatibility graph.
pub struct CompatibilityChecker<'a> {
    graph: &'a CompatibilityGraph,
}

impl<'a> CompatibilityChecker<'a> {
    #[must_use]
    pub fn new(graph: &'a CompatibilityGraph) -> Self {
        Self { graph }
    }

    /// True iff `license_name` appears as the source or target of any edge.
    #[must_use]
    pub fn is_license_exist(&self, license_name: &str) -> bool {
        self.graph
            .iter()
            .any(|((a, b), _)| a == license_name || b == license_name)
    }

    /// Check the compatibility of `license_a` with `license_b`, optionally
    /// narrowed to `scope`. When the edge is conditional, `scope` must be
    /// contained in the edge's recorded scope or the verdict degrades to
    /// `Incompatible`. Missing edges report `Unknown`.
    #[must_use]
    pub fn check_compatibility(
        &self,
        license_a: &str,
        license_b: &str,
        scope: Option<&Scope>,
    ) -> Compatibility {
        match self.graph.get(license_a, license_b) {
            Some(Compatibility::Conditional(edge_scope)) => {
                let requested = scope.cloned().unwrap_or_else(Scope::empty);
                if edge_scope.contains(&requested) {
                    Compatibility::Conditional(edge_scope.clone())
                } else {
                    Compatibility::Incompatible
                }
            }
            Some(other) => other.clone(),
            None => Compatibility::Unknown,
        }
    }

    /// Convenience overload accepting [`LicenseFeature`]s directly.
    #[must_use]
    pub fn check_compatibility_features(
        &self,
        license_a: &LicenseFeature,
        license_b: &LicenseFeature,
        scope: Option<&Scope>,
    ) -> Compatibility {
        self.check_compatibility(&license_a.spdx_id, &license_b.spdx_id, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_pair_reports_unknown() {
        let graph = CompatibilityGraph::new();
        let checker = CompatibilityChecker::new(&graph);
        assert_eq!(
            checker.check_compatibility("MIT", "GPL-2.0-only", None),
            Compatibility::Unknown
        );
    }

    #[test]
    fn conditional_edge_narrows_by_requested_scope() {
        let mut graph = CompatibilityGraph::new();
        graph.set(
            "MIT",
            "GPL-2.0-only",
            Compatibility::Conditional(Scope::single("STATIC_LINKING")),
        );
        let checker = CompatibilityChecker::new(&graph);

        let narrow = checker.check_compatibility(
            "MIT",
            "GPL-2.0-only",
            Some(&Scope::single("STATIC_LINKING")),
        );
        assert!(matches!(narrow, Compatibility::Conditional(_)));

        let wider = checker.check_compatibility(
            "MIT",
            "GPL-2.0-only",
            Some(&Scope::single("DYNAMIC_LINKING")),
        );
        assert_eq!(wider, Compatibility::Incompatible);
    }

    #[test]
    fn is_license_exist_checks_both_endpoints() {
        let mut graph = CompatibilityGraph::new();
        graph.set("MIT", "Apache-2.0", Compatibility::Unconditional);
        let checker = CompatibilityChecker::new(&graph);
        assert!(checker.is_license_exist("MIT"));
        assert!(checker.is_license_exist("Apache-2.0"));
        assert!(!checker.is_license_exist("GPL-2.0-only"));
    }
}
