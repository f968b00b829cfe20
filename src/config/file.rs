//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use std::path::{Path, PathBuf};

use super::types::AppConfig;

const CONFIG_FILE_NAMES: &[&str] = &[
    ".liccompat.yaml",
    ".liccompat.yml",
    "liccompat.yaml",
    "liccompat.yml",
    ".liccompatrc",
];

/// Discover a config file by searching standard locations.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Current directory
/// 3. Git repository root (if in a repo)
/// 4. User config directory (`~/.config/liccompat/`)
/// 5. Home directory
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if let Some(path) = find_config_in_dir(&cwd) {
            return Some(path);
        }
    }

    if let Some(git_root) = find_git_root() {
        if let Some(path) = find_config_in_dir(&git_root) {
            return Some(path);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let liccompat_dir = config_dir.join("liccompat");
        if let Some(path) = find_config_in_dir(&liccompat_dir) {
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        if let Some(path) = find_config_in_dir(&home) {
            return Some(path);
        }
    }

    None
}

fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    for name in CONFIG_FILE_NAMES {
        let path = dir.join(name);
        if path.exists() {
            return Some(path);
        }
    }
    None
}

fn find_git_root() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();

    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Error type for config file operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Load an `AppConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Load config from discovered file, or return default.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                (AppConfig::default(), None)
            }
        },
    )
}

impl AppConfig {
    /// Merge another config into this one, with `other` taking precedence
    /// wherever `other` deviates from its own defaults. Used to layer CLI
    /// flags over a loaded file.
    pub fn merge(&mut self, other: &Self) {
        if !other.core.license_isolations.is_empty() {
            self.core.license_isolations.clone_from(&other.core.license_isolations);
        }
        if !other.core.license_spread.spread_conditions.is_empty() {
            self.core
                .license_spread
                .spread_conditions
                .clone_from(&other.core.license_spread.spread_conditions);
        }
        if !other.core.license_spread.non_spread_conditions.is_empty() {
            self.core
                .license_spread
                .non_spread_conditions
                .clone_from(&other.core.license_spread.non_spread_conditions);
        }
        if !other.core.literal_mapping.is_empty() {
            self.core.literal_mapping.clone_from(&other.core.literal_mapping);
        }
        if !other.core.blacklist.is_empty() {
            self.core.blacklist.clone_from(&other.core.blacklist);
        }

        if other.resources.licenses_dir.is_some() {
            self.resources.licenses_dir.clone_from(&other.resources.licenses_dir);
        }
        if other.resources.exceptions_dir.is_some() {
            self.resources.exceptions_dir.clone_from(&other.resources.exceptions_dir);
        }
        if other.resources.schemas_path.is_some() {
            self.resources.schemas_path.clone_from(&other.resources.schemas_path);
        }

        if other.behavior.ignore_unk {
            self.behavior.ignore_unk = true;
        }
        if other.behavior.quiet {
            self.behavior.quiet = true;
        }
        if other.behavior.fail_on_conflict {
            self.behavior.fail_on_conflict = true;
        }

        if other.output.format != super::types::OutputFormat::default() {
            self.output.format = other.output.format;
        }
        if other.output.file.is_some() {
            self.output.file.clone_from(&other.output.file);
        }
        if other.output.no_color {
            self.output.no_color = true;
        }
    }

    /// Load from file and merge with CLI overrides.
    #[must_use]
    pub fn from_file_with_overrides(
        config_path: Option<&Path>,
        cli_overrides: &Self,
    ) -> (Self, Option<PathBuf>) {
        let (mut config, loaded_from) = load_or_default(config_path);
        config.merge(cli_overrides);
        (config, loaded_from)
    }
}

/// Generate an example config file's content, using the compiled-in defaults.
#[must_use]
pub fn generate_example_config() -> String {
    let example = AppConfig::default();
    format!(
        "# liccompat configuration\n# Place this file at .liccompat.yaml in your project root\n# or ~/.config/liccompat/liccompat.yaml\n\n{}\n",
        serde_yaml::to_string(&example).unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn finds_config_file_in_dir() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(".liccompat.yaml");
        std::fs::write(&config_path, "core:\n  blacklist: []\n").unwrap();

        let found = find_config_in_dir(tmp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn missing_config_file_is_none() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_config_in_dir(tmp.path()), None);
    }

    #[test]
    fn loads_config_file_contents() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.yaml");
        let yaml = "core:\n  blacklist:\n    - GPL-3.0-only\n  license_isolations: []\n";
        std::fs::write(&config_path, yaml).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.core.blacklist, vec!["GPL-3.0-only".to_string()]);
    }

    #[test]
    fn missing_config_file_errors() {
        let result = load_config_file(Path::new("/nonexistent/liccompat.yaml"));
        assert!(matches!(result, Err(ConfigFileError::NotFound(_))));
    }

    #[test]
    fn merge_overrides_only_non_default_fields() {
        let mut base = AppConfig::default();
        let overrides = AppConfig {
            behavior: super::super::types::BehaviorConfig {
                fail_on_conflict: true,
                ..Default::default()
            },
            ..AppConfig::default()
        };

        base.merge(&overrides);
        assert!(base.behavior.fail_on_conflict);
        assert!(!base.core.license_isolations.is_empty());
    }

    #[test]
    fn discover_explicit_path_short_circuits_search() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("custom.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "core:\n  blacklist: []").unwrap();

        assert_eq!(discover_config_file(Some(&config_path)), Some(config_path));
    }
}
