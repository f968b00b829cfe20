//! Configuration module for liccompat.
//!
//! This module provides:
//! - The reasoning engine's core [`Config`] (license isolation/spread rules,
//!   the project graph's literal-to-condition mapping, the SPDX blacklist)
//! - [`AppConfig`], the ambient CLI-facing layer around it
//! - YAML config file loading and discovery (`.liccompat.yaml`)
//! - Validation for all configuration values
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use liccompat::config::AppConfig;
//!
//! let config = AppConfig::default();
//!
//! use liccompat::config::file::load_or_default;
//! let (config, loaded_from) = load_or_default(None);
//! ```
//!
//! # Configuration File
//!
//! Place a `.liccompat.yaml` file in your project root or `~/.config/liccompat/`:
//!
//! ```yaml
//! core:
//!   license_isolations: [EXECUTABLE]
//!   blacklist: [AGPL-3.0-only]
//! behavior:
//!   fail_on_conflict: true
//! ```

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::DEFAULT_SPREAD_TOKEN;
pub use types::{
    AppConfig, BehaviorConfig, Config, LicenseSpread, OutputConfig, OutputFormat, ResourcesConfig,
};
pub use validation::{ConfigError, Validatable};

pub use file::{
    discover_config_file, generate_example_config, load_config_file, load_or_default,
    ConfigFileError,
};

/// Generate a JSON Schema for the `AppConfig` configuration format.
#[must_use]
pub fn generate_json_schema() -> String {
    let schema = schemars::schema_for!(AppConfig);
    serde_json::to_string_pretty(&schema).expect("schema serialization should not fail")
}
