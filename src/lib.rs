//! **A reasoning engine for license compatibility in dependency graphs.**
//!
//! `liccompat` determines whether a project's mix of third-party licenses,
//! combined according to how its dependencies actually link together
//! (statically linked, dynamically linked, spawned as a separate process,
//! and so on), is internally consistent. It is not a license *classifier*:
//! it takes a project dependency graph plus a declarative table of SPDX
//! license/exception features as input, and reports where two licenses
//! that reach the same linking unit make contradictory demands.
//!
//! ## Core Concepts & Modules
//!
//! - **[`scope`]**: The scope algebra (C1) — the lattice of usage
//!   conditions (`STATIC_LINKING`, `DYNAMIC_LINKING`, `EXECUTABLE`, ...)
//!   that a license clause or compatibility verdict can be scoped to.
//! - **[`features`]**: The license feature model (C2) — reduces a license
//!   description to `can`/`cannot`/`must`/`special` modal maps, driven by
//!   a declarative [`features::Schema`].
//! - **[`spdx`]**: SPDX expression parsing and dual-license algebra
//!   (C3 + C4) — parses `AND`/`OR`/`WITH` expressions into disjunctive
//!   normal form over [`spdx::DualUnit`] atoms.
//! - **[`inference`]**: Knowledge-graph inference (C5) — runs a fixed rule
//!   chain to converge a [`checker::CompatibilityGraph`] with exactly one
//!   terminal verdict per ordered license pair.
//! - **[`checker`]**: The compatibility checker (C6) — a query service over
//!   a converged `CompatibilityGraph`, narrowing conditional verdicts by
//!   the scope actually requested.
//! - **[`exceptions`]**: Exception materialisation (§4.6) — synthesises
//!   license features for compound `X-with-E` identifiers on demand, and
//!   rewrites or-later edges away from blacklisted SPDX ids.
//! - **[`project`]**: The project-graph propagation & conflict engine (C7)
//!   — walks a dependency DAG bottom-up to compute each node's effective
//!   outbound license, then top-down to flag every node where incompatible
//!   licenses land on the same unit.
//! - **[`resources`]**: Bundled resource loading (A3) — the default
//!   license/exception/schema table compiled into the binary, layered
//!   with an optional user-supplied override directory.
//! - **[`config`]**: The reasoning engine's core [`config::Config`] plus
//!   the ambient CLI-facing [`config::AppConfig`], with YAML config file
//!   loading and discovery.
//! - **[`reports`]**: Report generators for a checked project graph — the
//!   structured JSON conflict mapping (§6) and a human-readable summary.
//! - **[`cli`]**: Testable command handlers invoked by `main.rs`.
//! - **[`pipeline`]**: Shared orchestration helpers (output target
//!   selection, colour detection) used by the CLI handlers.
//!
//! ## Getting Started
//!
//! ```no_run
//! use std::path::Path;
//! use liccompat::config::AppConfig;
//! use liccompat::cli::run_check;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::default();
//!     let exit_code = run_check(Path::new("project.json"), &config, false)?;
//!     std::process::exit(exit_code);
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
// Pedantic lints: allow categories that are design choices for this codebase
#![allow(
    // Cast safety: usize↔f64 casts appear in report summary percentages
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    // Doc completeness: # Errors / # Panics sections are aspirational
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    // Variable names like `min`/`mid` or `old`/`new` are clear in context
    clippy::similar_names
)]

pub mod checker;
pub mod cli;
pub mod config;
pub mod error;
pub mod exceptions;
pub mod features;
pub mod inference;
pub mod pipeline;
pub mod project;
pub mod reports;
pub mod resources;
pub mod scope;
pub mod spdx;

// Re-export main types for convenience
pub use checker::CompatibilityChecker;
pub use config::{AppConfig, BehaviorConfig, Config, OutputConfig, ResourcesConfig};
pub use config::{ConfigError, Validatable};
pub use error::{ErrorContext, LicCompatError, OptionContext, Result};
pub use exceptions::{cover_from, materialize_exceptions, rewrite_blacklist_edges};
pub use features::{LicenseFeature, Schema};
pub use inference::{Compatibility, CompatibilityGraph, InferenceEngine};
pub use project::{ConflictId, ConflictTable, ProjectGraph, ProjectGraphInput};
pub use reports::{create_reporter, ReportFormat, ReportGenerator};
pub use scope::Scope;
pub use spdx::DualLicense;
