//! liccompat: reasons about whether a project's mixed licenses are
//! compatible, given a project dependency graph and a set of SPDX
//! license/exception feature files.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use liccompat::cli;
use liccompat::config::{AppConfig, BehaviorConfig, OutputConfig, OutputFormat};
use liccompat::LicCompatError;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// True for the two failure classes the `after_help` exit-code table
/// promises as `2`: a resource/input file that failed to load, or a
/// project graph with a cycle. Everything else keeps Rust's default 1.
fn is_load_or_cycle_error(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<LicCompatError>(),
        Some(LicCompatError::Load { .. } | LicCompatError::Cycle { .. } | LicCompatError::Io { .. })
    )
}

#[derive(Parser)]
#[command(name = "liccompat")]
#[command(version)]
#[command(about = "License compatibility reasoning engine", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  No conflicts detected (or --no-fail-on-conflict)
    1  Conflicts detected and --fail-on-conflict is set
    2  A configuration or input file failed to load, or the project graph contains a cycle

EXAMPLES:
    # Check a project graph against the bundled license table
    liccompat check project.json

    # Fail the process when a conflict is found (CI use)
    liccompat check project.json --fail-on-conflict -o summary

    # Inspect the converged knowledge graph alone
    liccompat infer -o conflicts.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a `.liccompat.yaml` config file (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output (also respects NO_COLOR env)
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `check` subcommand.
#[derive(Parser)]
struct CheckArgs {
    /// Path to the project graph JSON document (§6 external interface)
    project_graph: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,

    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,

    /// Treat an `Unknown` compatibility verdict as compatible
    #[arg(long)]
    ignore_unk: bool,

    /// Exit with status 1 when any conflict is found
    #[arg(long)]
    fail_on_conflict: bool,

    /// Suppress non-essential diagnostics
    #[arg(short, long)]
    quiet: bool,
}

/// Arguments for the `infer` subcommand.
#[derive(Parser)]
struct InferArgs {
    /// Output file path (stdout if not specified)
    #[arg(short = 'O', long)]
    output_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a project dependency graph for license conflicts
    Check(CheckArgs),

    /// Converge and print the knowledge graph alone, without a project graph
    Infer(InferArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate JSON Schema for the config file format
    ConfigSchema {
        /// Write schema to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Check(args) => {
            let overrides = AppConfig {
                behavior: BehaviorConfig {
                    ignore_unk: args.ignore_unk,
                    quiet: args.quiet,
                    fail_on_conflict: args.fail_on_conflict,
                },
                output: OutputConfig {
                    format: args.output,
                    file: args.output_file,
                    no_color: cli.no_color,
                },
                ..AppConfig::default()
            };
            let (config, _loaded_from) =
                AppConfig::from_file_with_overrides(cli.config.as_deref(), &overrides);

            let exit_code = match cli::run_check(&args.project_graph, &config, cli.no_color) {
                Ok(code) => code,
                Err(err) if is_load_or_cycle_error(&err) => {
                    eprintln!("Error: {err:#}");
                    std::process::exit(2);
                }
                Err(err) => return Err(err),
            };
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }

        Commands::Infer(args) => {
            let (config, _loaded_from) =
                AppConfig::from_file_with_overrides(cli.config.as_deref(), &AppConfig::default());
            match cli::run_infer(&config, args.output_file) {
                Ok(()) => Ok(()),
                Err(err) if is_load_or_cycle_error(&err) => {
                    eprintln!("Error: {err:#}");
                    std::process::exit(2);
                }
                Err(err) => Err(err),
            }
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "liccompat", &mut io::stdout());
            Ok(())
        }

        Commands::ConfigSchema { output } => {
            let schema = liccompat::config::generate_json_schema();
            match output {
                Some(path) => {
                    std::fs::write(&path, &schema)?;
                    eprintln!("Schema written to {}", path.display());
                }
                None => {
                    println!("{schema}");
                }
            }
            Ok(())
        }
    }
}
