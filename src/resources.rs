//! Bundled resource loading (A3).
//!
//! Ships a default license/exception/schema table compiled into the binary
//! via `include_str!`, and layers an optional user-supplied override
//! directory on top (`AppConfig.resources`), the same "builtin defaults plus
//! on-disk overrides" shape the teacher crate uses for its matching rules.

use std::path::Path;

use indexmap::IndexMap;

use crate::config::ResourcesConfig;
use crate::error::{ErrorContext, LicCompatError, Result};
use crate::features::{LicenseFeature, Schema};

macro_rules! bundled_licenses {
    ($($id:literal),+ $(,)?) => {
        &[$(($id, include_str!(concat!("../resources/licenses/", $id, ".toml")))),+]
    };
}

macro_rules! bundled_exceptions {
    ($($id:literal),+ $(,)?) => {
        &[$(($id, include_str!(concat!("../resources/exceptions/", $id, ".toml")))),+]
    };
}

const BUNDLED_LICENSES: &[(&str, &str)] = bundled_licenses!(
    "MIT",
    "ISC",
    "BSD-3-Clause",
    "Apache-2.0",
    "GPL-2.0-only",
    "GPL-2.0-or-later",
    "GPL-3.0-only",
    "GPL-3.0-or-later",
    "LGPL-2.1-only",
    "LGPL-2.1-or-later",
    "MPL-2.0",
    "public-domain",
    "CC-BY-NC-4.0",
);

const BUNDLED_EXCEPTIONS: &[(&str, &str)] = bundled_exceptions!("Classpath-exception-2.0");

const BUNDLED_SCHEMAS: &str = include_str!("../resources/schemas.toml");

fn load_bundled(table: &[(&str, &str)]) -> Result<IndexMap<String, LicenseFeature>> {
    table
        .iter()
        .map(|(id, text)| LicenseFeature::from_toml_str(*id, text).map(|feat| (feat.spdx_id.clone(), feat)))
        .collect()
}

/// Load every `*.toml` file in `dir` as a license feature, keyed by its file stem.
fn load_dir(dir: &Path) -> Result<IndexMap<String, LicenseFeature>> {
    let mut table = IndexMap::new();

    let entries = std::fs::read_dir(dir)
        .map_err(|e| LicCompatError::io(dir, e))
        .context(format!("reading resource directory {dir:?}"))?;

    for entry in entries {
        let entry = entry
            .map_err(|e| LicCompatError::io(dir, e))
            .context(format!("reading resource directory {dir:?}"))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("toml") {
            continue;
        }
        if path.file_stem().and_then(|s| s.to_str()) == Some("schemas") {
            continue;
        }

        let feat = LicenseFeature::from_toml_file(&path)?;
        table.insert(feat.spdx_id.clone(), feat);
    }

    Ok(table)
}

/// The full set of license features: bundled defaults, with a user-supplied
/// directory's files inserted on top (same spdx id overrides the bundled one).
pub fn load_licenses(resources: &ResourcesConfig) -> Result<IndexMap<String, LicenseFeature>> {
    let mut table = load_bundled(BUNDLED_LICENSES)?;
    if let Some(dir) = &resources.licenses_dir {
        for (id, feat) in load_dir(dir)? {
            table.insert(id, feat);
        }
    }
    Ok(table)
}

/// The full set of exception features, same override semantics as [`load_licenses`].
pub fn load_exceptions(resources: &ResourcesConfig) -> Result<IndexMap<String, LicenseFeature>> {
    let mut table = load_bundled(BUNDLED_EXCEPTIONS)?;
    if let Some(dir) = &resources.exceptions_dir {
        for (id, feat) in load_dir(dir)? {
            table.insert(id, feat);
        }
    }
    Ok(table)
}

/// The action schema: the override path replaces the bundled schema wholesale
/// (schemas aren't merged entry-by-entry, unlike license/exception tables).
pub fn load_schemas(resources: &ResourcesConfig) -> Result<Schema> {
    match &resources.schemas_path {
        Some(path) => Schema::from_toml_file(path),
        None => Schema::from_toml_str(BUNDLED_SCHEMAS).context("bundled schemas.toml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_licenses_all_parse() {
        let licenses = load_licenses(&ResourcesConfig::default()).unwrap();
        assert!(licenses.contains_key("MIT"));
        assert!(licenses.contains_key("GPL-3.0-or-later"));
        assert_eq!(licenses.len(), BUNDLED_LICENSES.len());
    }

    #[test]
    fn bundled_exceptions_all_parse() {
        let exceptions = load_exceptions(&ResourcesConfig::default()).unwrap();
        assert!(exceptions.contains_key("Classpath-exception-2.0"));
    }

    #[test]
    fn bundled_schema_declares_core_actions() {
        let schema = load_schemas(&ResourcesConfig::default()).unwrap();
        assert!(schema.is_compliance("disclose_source"));
        assert!(schema.is_immutable("commercial_use"));
    }

    #[test]
    fn mit_license_feature_matches_expected_shape() {
        let licenses = load_licenses(&ResourcesConfig::default()).unwrap();
        let mit = &licenses["MIT"];
        assert!(mit.can.contains_key("sublicense"));
        assert!(!mit.human_review);
    }

    #[test]
    fn override_directory_shadows_bundled_entry() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("MIT.toml"), "human_review = true\n").unwrap();

        let resources = ResourcesConfig {
            licenses_dir: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let licenses = load_licenses(&resources).unwrap();
        assert!(licenses["MIT"].human_review);
    }
}
