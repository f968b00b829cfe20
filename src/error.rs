//! Unified error types for liccompat.
//!
//! Mirrors the error-kind taxonomy of the underlying reasoning engine: each
//! stage of the pipeline (resource loading, inference, propagation, CLI)
//! wraps the errors it produces in a context chain so a failure deep in the
//! rule chain can still be traced back to the file or node that triggered it.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for liccompat operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LicCompatError {
    /// A feature file, schema file, or config file failed to parse.
    #[error("Failed to load {context}")]
    Load {
        context: String,
        #[source]
        source: LoadErrorKind,
    },

    /// An action referenced by a license is absent from the schema.
    #[error("License '{license}' references action '{action}' which is not in the schema")]
    Schema { license: String, action: String },

    /// The project graph contains a cycle.
    #[error("Project graph contains a cycle involving node '{node}'")]
    Cycle { node: String },

    /// A rule chain revisited a rule for the same license pair.
    #[error("Rule '{rule}' was visited twice while inferring {license_a} -> {license_b}")]
    RuleRevisited {
        rule: String,
        license_a: String,
        license_b: String,
    },

    /// An SPDX expression could not be parsed.
    #[error("Failed to parse SPDX expression: {context}")]
    Parse {
        context: String,
        #[source]
        source: ParseErrorKind,
    },

    /// IO errors with context.
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Validation errors.
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific load error kinds.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LoadErrorKind {
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Specific SPDX-expression parse error kinds.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("missing closing parenthesis")]
    UnclosedParen,

    #[error("unexpected closing parenthesis at position {position}")]
    UnexpectedCloseParen { position: usize },

    #[error("WITH operator must follow a single license id, not a compound expression")]
    WithAfterCompound,

    #[error("trailing tokens after expression: {0:?}")]
    TrailingTokens(Vec<String>),
}

/// Convenient Result type for liccompat operations.
pub type Result<T> = std::result::Result<T, LicCompatError>;

impl LicCompatError {
    /// Create a load error with context.
    pub fn load(context: impl Into<String>, source: LoadErrorKind) -> Self {
        Self::Load {
            context: context.into(),
            source,
        }
    }

    /// Create a schema-violation error.
    pub fn schema(license: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Schema {
            license: license.into(),
            action: action.into(),
        }
    }

    /// Create a cycle error.
    pub fn cycle(node: impl Into<String>) -> Self {
        Self::Cycle { node: node.into() }
    }

    /// Create a rule-revisited error.
    pub fn rule_revisited(
        rule: impl Into<String>,
        license_a: impl Into<String>,
        license_b: impl Into<String>,
    ) -> Self {
        Self::RuleRevisited {
            rule: rule.into(),
            license_a: license_a.into(),
            license_b: license_b.into(),
        }
    }

    /// Create a parse error with context.
    pub fn parse(context: impl Into<String>, source: ParseErrorKind) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<std::io::Error> for LicCompatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

/// Extension trait for adding context to errors as they cross module boundaries.
pub trait ErrorContext<T> {
    /// Add context to an error, chained with any context already present.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, evaluated only on the error path.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<LicCompatError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

fn add_context_to_error(err: LicCompatError, new_ctx: &str) -> LicCompatError {
    match err {
        LicCompatError::Load { context, source } => LicCompatError::Load {
            context: chain_context(new_ctx, &context),
            source,
        },
        LicCompatError::Parse { context, source } => LicCompatError::Parse {
            context: chain_context(new_ctx, &context),
            source,
        },
        LicCompatError::Io {
            path,
            message,
            source,
        } => LicCompatError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        LicCompatError::Config(msg) => LicCompatError::Config(chain_context(new_ctx, &msg)),
        LicCompatError::Validation(msg) => {
            LicCompatError::Validation(chain_context(new_ctx, &msg))
        }
        other => other,
    }
}

fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for `Option` to convert `None` into an error with context.
pub trait OptionContext<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| LicCompatError::Validation(context.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_chains_instead_of_replacing() {
        let initial: Result<()> = Err(LicCompatError::config("base"));
        let chained = initial.context("outer");
        match chained {
            Err(LicCompatError::Config(msg)) => {
                assert!(msg.contains("outer"));
                assert!(msg.contains("base"));
            }
            _ => panic!("expected Config error"),
        }
    }

    #[test]
    fn multi_level_context_chain() {
        fn inner() -> Result<()> {
            Err(LicCompatError::config("base"))
        }
        fn middle() -> Result<()> {
            inner().context("middle")
        }
        fn outer() -> Result<()> {
            middle().context("outer")
        }

        match outer() {
            Err(LicCompatError::Config(msg)) => {
                assert_eq!(msg, "outer: middle: base");
            }
            _ => panic!("expected Config error"),
        }
    }

    #[test]
    fn lazy_context_not_evaluated_on_ok() {
        let mut called = false;
        let ok: Result<i32> = Ok(42);
        let _ = ok.with_context(|| {
            called = true;
            "unused"
        });
        assert!(!called);
    }

    #[test]
    fn option_context_none_becomes_validation_error() {
        let none: Option<i32> = None;
        match none.context_none("missing value") {
            Err(LicCompatError::Validation(msg)) => assert_eq!(msg, "missing value"),
            _ => panic!("expected Validation error"),
        }
    }
}
