//! Configuration data types.

use std::collections::HashMap;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scope::UsageCondition;

/// Defines which usage conditions make a license "spread" (propagate its
/// terms to the whole project) even when no variability exists between the
/// node and its children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LicenseSpread {
    #[serde(default)]
    pub spread_conditions: Vec<String>,
    #[serde(default)]
    pub non_spread_conditions: Vec<String>,
}

/// The core reasoning-engine config: which usage conditions isolate a
/// license (stop it propagating upward), which ones spread it, how the
/// project-graph's own node-type literals map onto usage-condition tokens,
/// and which SPDX ids are outright forbidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(default)]
    pub license_isolations: Vec<String>,
    #[serde(default)]
    pub license_spread: LicenseSpread,
    #[serde(default)]
    pub literal_mapping: HashMap<String, String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
}

impl Config {
    /// Convert a project-graph node-type literal to its canonical usage
    /// condition token, or `""` if unmapped.
    #[must_use]
    pub fn literal_to_condition(&self, literal: &str) -> &str {
        self.literal_mapping
            .get(literal)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// All node-type literals that map to `condition`.
    #[must_use]
    pub fn condition_to_literals(&self, condition: &str) -> Vec<&str> {
        self.literal_mapping
            .iter()
            .filter(|(_, v)| v.as_str() == condition)
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

/// Paths to override the bundled license/exception/schema resource tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResourcesConfig {
    #[serde(default)]
    pub licenses_dir: Option<PathBuf>,
    #[serde(default)]
    pub exceptions_dir: Option<PathBuf>,
    #[serde(default)]
    pub schemas_path: Option<PathBuf>,
}

/// Runtime behaviour flags for the `check`/`infer` commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BehaviorConfig {
    /// Treat an `Unknown` compatibility verdict as compatible rather than a conflict.
    #[serde(default)]
    pub ignore_unk: bool,
    /// Suppress non-essential diagnostics.
    #[serde(default)]
    pub quiet: bool,
    /// Exit with a non-zero status when any conflict is found.
    #[serde(default)]
    pub fail_on_conflict: bool,
}

/// Report output preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub no_color: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Summary,
}

/// Top-level application configuration, combining the reasoning engine's
/// core `Config` with the ambient CLI-facing layers (resource overrides,
/// behaviour flags, output preferences).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AppConfig {
    #[serde(default)]
    pub core: Config,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// The default mapping from the four usage conditions onto themselves —
    /// used when no `.liccompat.yaml` is present.
    #[must_use]
    pub fn default_literal_mapping() -> HashMap<String, String> {
        UsageCondition::all()
            .iter()
            .map(|c| (c.token().to_ascii_lowercase(), c.token().to_string()))
            .collect()
    }
}
