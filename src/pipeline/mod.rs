//! Shared orchestration helpers for CLI command handlers.

mod output;

pub use output::{should_use_color, write_output, OutputTarget};
