//! `check` command handler: run the full pipeline over a project graph.
//!
//! Loads the bundled (plus any overridden) license/exception/schema
//! resources, converges the knowledge graph, then propagates and
//! checks a project graph JSON document, writing a report to the
//! configured output target. Mirrors the teacher's `run_validate`
//! shape: load input, run the engine, render, write, set exit code.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::error::{LicCompatError, LoadErrorKind};
use crate::inference::InferenceEngine;
use crate::pipeline::{should_use_color, write_output, OutputTarget};
use crate::project::{ProjectGraph, ProjectGraphInput};
use crate::reports::create_reporter;
use crate::{exceptions, resources};

/// Load the project graph input, converge the knowledge graph, run
/// propagation + conflict detection, and render the configured report.
///
/// Returns the process exit code (0 = no conflicts or `fail_on_conflict`
/// disabled, 1 = conflicts found and `fail_on_conflict` is set).
pub fn run_check(graph_path: &Path, config: &AppConfig, no_color_flag: bool) -> Result<i32> {
    let input = load_project_graph(graph_path)?;
    let mut graph = ProjectGraph::from_input(input);

    let licenses = resources::load_licenses(&config.resources)?;
    let raw_exceptions = resources::load_exceptions(&config.resources)?;
    let schema = resources::load_schemas(&config.resources)?;

    let mut engine = InferenceEngine::new(&schema);
    let compat_graph = engine.infer(&licenses)?;

    let project_licenses: Vec<&crate::spdx::DualLicense> = graph
        .node_ids()
        .filter_map(|id| graph.node_state(id).and_then(|s| s.licenses.as_ref()))
        .collect();
    let (_licenses, mut compat_graph) = exceptions::materialize_exceptions(
        project_licenses.into_iter(),
        licenses,
        &raw_exceptions,
        &schema,
        compat_graph,
    );
    exceptions::rewrite_blacklist_edges(&mut compat_graph, &config.core.blacklist);

    let table = graph.propagate_and_check(&config.core, &compat_graph, config.behavior.ignore_unk)?;

    let use_color = should_use_color(no_color_flag || config.output.no_color);
    let reporter = create_reporter(config.output.format.into(), use_color);
    let report = reporter.generate_report(&graph)?;

    let target = OutputTarget::from_option(config.output.file.clone());
    write_output(&report, &target, config.behavior.quiet)?;

    let has_conflicts = table.entries().count() > 0;
    if has_conflicts && config.behavior.fail_on_conflict {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn load_project_graph(path: &Path) -> Result<ProjectGraphInput> {
    let content = std::fs::read_to_string(path).map_err(|e| LicCompatError::io(path, e))?;
    let input = serde_json::from_str(&content).map_err(|e| {
        LicCompatError::load(
            format!("project graph {}", path.display()),
            LoadErrorKind::Json(e),
        )
    })?;
    Ok(input)
}

/// `infer` command handler: converge and print the knowledge graph alone,
/// without a project graph. Useful for inspecting what the bundled (or
/// overridden) license resources resolve to.
pub fn run_infer(config: &AppConfig, output_file: Option<PathBuf>) -> Result<()> {
    let licenses = resources::load_licenses(&config.resources)?;
    let schema = resources::load_schemas(&config.resources)?;

    let mut engine = InferenceEngine::new(&schema);
    let mut compat_graph = engine.infer(&licenses)?;
    exceptions::rewrite_blacklist_edges(&mut compat_graph, &config.core.blacklist);

    let json = serde_json::to_string_pretty(&compat_graph)
        .context("serializing converged knowledge graph")?;

    let target = OutputTarget::from_option(output_file);
    write_output(&json, &target, config.behavior.quiet)?;
    Ok(())
}
