//! Configuration validation.

use super::types::{AppConfig, Config};

/// Error produced when a config value fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("'{condition}' appears in both spread_conditions and non_spread_conditions")]
    ConflictingSpreadCondition { condition: String },
    #[error("literal_mapping maps '{literal}' to unknown condition '{condition}'")]
    UnknownCondition { literal: String, condition: String },
}

/// Implemented by every config type that can be checked for internal
/// consistency before use.
pub trait Validatable {
    fn validate(&self) -> Result<(), ConfigError>;
}

const KNOWN_CONDITIONS: &[&str] = &["COMPILE", "STATIC_LINKING", "DYNAMIC_LINKING", "EXECUTABLE"];

impl Validatable for Config {
    fn validate(&self) -> Result<(), ConfigError> {
        for condition in &self.license_spread.spread_conditions {
            if condition != "DEFAULT" && self.license_spread.non_spread_conditions.contains(condition) {
                return Err(ConfigError::ConflictingSpreadCondition {
                    condition: condition.clone(),
                });
            }
        }

        for (literal, condition) in &self.literal_mapping {
            if !KNOWN_CONDITIONS.contains(&condition.as_str()) {
                return Err(ConfigError::UnknownCondition {
                    literal: literal.clone(),
                    condition: condition.clone(),
                });
            }
        }

        Ok(())
    }
}

impl Validatable for AppConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.core.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn conflicting_spread_conditions_rejected() {
        let mut config = Config::default();
        config.license_spread.spread_conditions = vec!["STATIC_LINKING".to_string()];
        config.license_spread.non_spread_conditions = vec!["STATIC_LINKING".to_string()];
        assert_eq!(
            config.validate(),
            Err(ConfigError::ConflictingSpreadCondition {
                condition: "STATIC_LINKING".to_string()
            })
        );
    }

    #[test]
    fn unknown_condition_in_literal_mapping_rejected() {
        let mut config = Config::default();
        config
            .literal_mapping
            .insert("weird".to_string(), "NOT_A_CONDITION".to_string());
        assert!(config.validate().is_err());
    }
}
