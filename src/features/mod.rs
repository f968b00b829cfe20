//! License feature model (C2).
//!
//! A license is loaded from a declarative description and reduced to four
//! modal maps of [`ActionFeature`]s (`can`, `cannot`, `must`, `special`),
//! each indexed by action name. The schema is the sole source of truth for
//! which actions carry which properties (`immutability`, `compliance`) and
//! which modal-pairs conflict for a given action.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, LicCompatError, LoadErrorKind, Result};
use crate::scope::{Scope, UNIVERSE};

/// The modal under which an action is asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modal {
    Can,
    Cannot,
    Must,
    Special,
}

impl Modal {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Can => "can",
            Self::Cannot => "cannot",
            Self::Must => "must",
            Self::Special => "special",
        }
    }
}

/// Raw, on-disk shape of a single action entry within a license TOML file.
#[derive(Debug, Clone, Deserialize)]
struct RawActionFeat {
    #[serde(default)]
    protect_scope: Vec<String>,
    #[serde(default)]
    escape_scope: Vec<String>,
    #[serde(default)]
    target: Vec<String>,
}

/// A single action clause: which action, under which modal, under what scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFeature {
    pub name: String,
    pub modal: Modal,
    pub scope: Scope,
    /// Relicensing targets or other modal-specific referents (e.g. `special.relicense`).
    #[serde(default)]
    pub target: Vec<String>,
}

impl ActionFeature {
    fn from_raw(name: impl Into<String>, modal: Modal, raw: RawActionFeat) -> Self {
        let protect = if raw.protect_scope.is_empty() {
            vec![UNIVERSE.to_string()]
        } else {
            raw.protect_scope
        };
        let scope = Scope::from_protect_escape(protect, raw.escape_scope);
        Self {
            name: name.into(),
            modal,
            scope,
            target: raw.target,
        }
    }
}

/// On-disk shape of a whole license feature file.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawLicenseFeat {
    #[serde(default)]
    can: IndexMap<String, RawActionFeat>,
    #[serde(default)]
    cannot: IndexMap<String, RawActionFeat>,
    #[serde(default)]
    must: IndexMap<String, RawActionFeat>,
    #[serde(default)]
    special: IndexMap<String, RawActionFeat>,
    #[serde(default = "default_human_review")]
    human_review: bool,
}

fn default_human_review() -> bool {
    true
}

/// The feature description of a single SPDX license id.
///
/// Immutable after load. Modal maps are order-preserving (`IndexMap`), so
/// rule evaluation order — and therefore inference determinism — does not
/// depend on hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseFeature {
    pub spdx_id: String,
    pub can: IndexMap<String, ActionFeature>,
    pub cannot: IndexMap<String, ActionFeature>,
    pub must: IndexMap<String, ActionFeature>,
    pub special: IndexMap<String, ActionFeature>,
    pub human_review: bool,
}

impl LicenseFeature {
    /// Load a single license's feature description from a TOML file. The
    /// file's stem (minus extension) becomes the SPDX id.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let spdx_id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| LicCompatError::validation(format!("invalid license file name: {path:?}")))?
            .to_string();

        let text = std::fs::read_to_string(path)
            .map_err(|e| LicCompatError::io(path, e))
            .context(format!("reading license file {path:?}"))?;

        Self::from_toml_str(spdx_id, &text)
    }

    /// Parse a license's feature description from TOML text with an explicit SPDX id.
    pub fn from_toml_str(spdx_id: impl Into<String>, text: &str) -> Result<Self> {
        let spdx_id = spdx_id.into();
        let raw: RawLicenseFeat = toml::from_str(text)
            .map_err(|e| LicCompatError::load(format!("license '{spdx_id}'"), LoadErrorKind::Toml(e)))?;

        let build = |modal: Modal, entries: IndexMap<String, RawActionFeat>| -> IndexMap<String, ActionFeature> {
            entries
                .into_iter()
                .map(|(name, raw)| {
                    let feat = ActionFeature::from_raw(name.clone(), modal, raw);
                    (name, feat)
                })
                .collect()
        };

        Ok(Self {
            can: build(Modal::Can, raw.can),
            cannot: build(Modal::Cannot, raw.cannot),
            must: build(Modal::Must, raw.must),
            special: build(Modal::Special, raw.special),
            human_review: raw.human_review,
            spdx_id,
        })
    }

    /// All action clauses across the four modals, in insertion order: `can`, `cannot`, `must`, `special`.
    pub fn features(&self) -> impl Iterator<Item = &ActionFeature> {
        self.can
            .values()
            .chain(self.cannot.values())
            .chain(self.must.values())
            .chain(self.special.values())
    }

    /// The protect-scope tokens named anywhere across this license's action clauses.
    #[must_use]
    pub fn scope_elems(&self) -> Vec<&str> {
        let mut elems: Vec<&str> = self
            .features()
            .flat_map(|f| f.scope.protect_scope())
            .collect();
        elems.sort_unstable();
        elems.dedup();
        elems
    }

    fn modal_map(&self, modal: Modal) -> &IndexMap<String, ActionFeature> {
        match modal {
            Modal::Can => &self.can,
            Modal::Cannot => &self.cannot,
            Modal::Must => &self.must,
            Modal::Special => &self.special,
        }
    }

    /// Look up an action clause by modal and name.
    #[must_use]
    pub fn action(&self, modal: Modal, name: &str) -> Option<&ActionFeature> {
        self.modal_map(modal).get(name)
    }

    /// The `special.relicense` clause, if this license declares one.
    #[must_use]
    pub fn relicense(&self) -> Option<&ActionFeature> {
        self.special.get("relicense")
    }

    /// The `special.triggering` clause, if this license declares one. Its
    /// `target` list holds `modal.action` pairs activated by use.
    #[must_use]
    pub fn triggering(&self) -> Option<&ActionFeature> {
        self.special.get("triggering")
    }
}

/// On-disk shape of the schema file: one entry per action, describing which
/// boolean properties it carries and which modal-pairs conflict for it.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawSchemas {
    #[serde(default)]
    actions: IndexMap<String, ActionProperties>,
}

/// Properties a schema attaches to a single action.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ActionProperties {
    #[serde(default)]
    pub immutability: bool,
    #[serde(default)]
    pub compliance: bool,
    /// Modal pairs, e.g. `[["must", "cannot"], ["can", "cannot"]]`, that
    /// count as a conflict when both sides assert the same action.
    #[serde(default = "default_conflicts")]
    pub conflicts: Vec<(Modal, Modal)>,
}

fn default_conflicts() -> Vec<(Modal, Modal)> {
    vec![(Modal::Can, Modal::Cannot), (Modal::Must, Modal::Cannot)]
}

/// The action schema: the sole source of truth for which properties an
/// action carries and which modal-pairs are mutually conflicting for it.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    actions: IndexMap<String, ActionProperties>,
}

impl Schema {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let raw: RawSchemas = toml::from_str(text)
            .map_err(|e| LicCompatError::load("schema file", LoadErrorKind::Toml(e)))?;
        Ok(Self {
            actions: raw.actions,
        })
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| LicCompatError::io(path, e))
            .context(format!("reading schema file {path:?}"))?;
        Self::from_toml_str(&text)
    }

    /// True iff `property` is set for `action_name`.
    #[must_use]
    pub fn has_property(&self, action_name: &str, property: &str) -> bool {
        self.actions
            .get(action_name)
            .is_some_and(|props| match property {
                "immutability" => props.immutability,
                "compliance" => props.compliance,
                _ => false,
            })
    }

    /// True iff this action carries the `immutability` property.
    #[must_use]
    pub fn is_immutable(&self, action_name: &str) -> bool {
        self.has_property(action_name, "immutability")
    }

    /// True iff this action carries the `compliance` property.
    #[must_use]
    pub fn is_compliance(&self, action_name: &str) -> bool {
        self.has_property(action_name, "compliance")
    }

    /// The conflict modal-pairs registered for `action_name`, defaulting to
    /// `(can, cannot)` and `(must, cannot)` if the action is entirely unknown.
    /// A known action with a declared-empty `conflicts = []` list is returned
    /// as an empty `Vec` as-is — callers must treat that as "no filter",
    /// not "never conflicts" (see `InferenceEngine::clause_conflict`).
    #[must_use]
    pub fn conflicts_for(&self, action_name: &str) -> Vec<(Modal, Modal)> {
        self.actions
            .get(action_name)
            .map(|p| p.conflicts.clone())
            .unwrap_or_else(default_conflicts)
    }

    /// All action names with at least one declared property.
    #[must_use]
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIT_TOML: &str = r#"
        [can.modify]
        [can.distribute]
        [can.sublicense]
        [must.include_notice]
        protect_scope = ["DISTRIBUTE"]
    "#;

    #[test]
    fn parses_modal_maps_in_order() {
        let feat = LicenseFeature::from_toml_str("MIT", MIT_TOML).unwrap();
        let names: Vec<&str> = feat.can.keys().map(String::as_str).collect();
        assert_eq!(names, ["modify", "distribute", "sublicense"]);
        assert!(feat.action(Modal::Must, "include_notice").is_some());
    }

    #[test]
    fn missing_protect_scope_defaults_to_universe() {
        let feat = LicenseFeature::from_toml_str("MIT", MIT_TOML).unwrap();
        let modify = feat.action(Modal::Can, "modify").unwrap();
        assert!(modify.scope.is_universal());
    }

    #[test]
    fn explicit_protect_scope_is_not_universal() {
        let feat = LicenseFeature::from_toml_str("MIT", MIT_TOML).unwrap();
        let notice = feat.action(Modal::Must, "include_notice").unwrap();
        assert!(!notice.scope.is_universal());
    }

    #[test]
    fn schema_default_conflicts_cover_can_cannot_and_must_cannot() {
        let schema = Schema::from_toml_str("[actions]\n").unwrap();
        let conflicts = schema.conflicts_for("modify");
        assert!(conflicts.contains(&(Modal::Can, Modal::Cannot)));
        assert!(conflicts.contains(&(Modal::Must, Modal::Cannot)));
    }

    #[test]
    fn schema_reads_immutability_property() {
        let text = r#"
            [actions.modify]
            immutability = true
        "#;
        let schema = Schema::from_toml_str(text).unwrap();
        assert!(schema.is_immutable("modify"));
        assert!(!schema.is_compliance("modify"));
    }
}
