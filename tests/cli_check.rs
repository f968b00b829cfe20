//! Integration test for the `check` CLI command handler (§8 ambient
//! tooling note: "a CLI `check` subcommand integration test against a
//! JSON fixture project graph").

use liccompat::cli::run_check;
use liccompat::config::AppConfig;

fn write_fixture(dir: &tempfile::TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("project.json");
    std::fs::write(&path, json).unwrap();
    path
}

#[test]
fn clean_project_graph_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        r#"{
            "nodes": [
                {"id": "app", "node_type": "static_linking"},
                {"id": "lib_a", "node_type": "static_linking", "licenses": [[{"spdx_id": "MIT", "condition": null, "exceptions": []}]]},
                {"id": "lib_b", "node_type": "static_linking", "licenses": [[{"spdx_id": "MIT", "condition": null, "exceptions": []}]]}
            ],
            "edges": [
                {"parent": "app", "child": "lib_a"},
                {"parent": "app", "child": "lib_b"}
            ]
        }"#,
    );

    let config = AppConfig::default();
    let exit_code = run_check(&path, &config, true).unwrap();
    assert_eq!(exit_code, 0);
}

#[test]
fn conflicting_project_graph_fails_when_configured_to() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(
        &dir,
        r#"{
            "nodes": [
                {"id": "app", "node_type": "static_linking"},
                {"id": "lib_gpl", "node_type": "static_linking", "licenses": [[{"spdx_id": "GPL-2.0-only", "condition": null, "exceptions": []}]]},
                {"id": "lib_apache", "node_type": "static_linking", "licenses": [[{"spdx_id": "Apache-2.0", "condition": null, "exceptions": []}]]}
            ],
            "edges": [
                {"parent": "app", "child": "lib_gpl"},
                {"parent": "app", "child": "lib_apache"}
            ]
        }"#,
    );

    let mut config = AppConfig::default();
    config.behavior.fail_on_conflict = true;
    let exit_code = run_check(&path, &config, true).unwrap();
    assert_eq!(exit_code, 1);
}

#[test]
fn malformed_project_graph_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "{ not json");

    let config = AppConfig::default();
    assert!(run_check(&path, &config, true).is_err());
}
