//! Default configuration values for liccompat.

use super::types::{AppConfig, Config, LicenseSpread};

/// The condition token `license_spread` uses to mean "spread by default,
/// unless a condition is explicitly excluded".
pub const DEFAULT_SPREAD_TOKEN: &str = "DEFAULT";

impl Default for Config {
    fn default() -> Self {
        Self {
            license_isolations: vec!["EXECUTABLE".to_string()],
            license_spread: LicenseSpread {
                spread_conditions: vec![DEFAULT_SPREAD_TOKEN.to_string()],
                non_spread_conditions: Vec::new(),
            },
            literal_mapping: AppConfig::default_literal_mapping(),
            blacklist: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_isolates_executables_and_spreads_by_default() {
        let config = Config::default();
        assert!(config.license_isolations.contains(&"EXECUTABLE".to_string()));
        assert!(config
            .license_spread
            .spread_conditions
            .contains(&DEFAULT_SPREAD_TOKEN.to_string()));
        assert_eq!(
            config.literal_to_condition("static_linking"),
            "STATIC_LINKING"
        );
    }
}
