//! Configuration parsing and validation for lotkeeperd
//!
//! Supports TOML configuration with:
//! - Versioned schema
//! - Billing tariff
//! - Slot layout provisioned at startup
//! - Validation with clear error messages

mod policy;
mod schema;
mod validation;

pub use policy::*;
pub use schema::*;
pub use validation::*;

use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<ValidationError> },

    #[error("Unsupported config version: {0}")]
    UnsupportedVersion(u32),
}

impl From<ConfigError> for lotkeeper_util::LotError {
    fn from(err: ConfigError) -> Self {
        lotkeeper_util::LotError::config(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Current supported config version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Load and validate configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<LotPolicy> {
    let path = path.as_ref();
    debug!(path = %path.display(), "Loading configuration");
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from a TOML string
pub fn parse_config(content: &str) -> ConfigResult<LotPolicy> {
    let raw: RawConfig = toml::from_str(content)?;

    if raw.config_version != CURRENT_CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(raw.config_version));
    }

    let errors = validate_config(&raw);
    if !errors.is_empty() {
        return Err(ConfigError::ValidationFailed { errors });
    }

    Ok(LotPolicy::from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_minimal_config() {
        let policy = parse_config(
            r#"
            config_version = 1

            [billing]
            tariff_per_minute = 60

            [lot]
            rows = ["A", "B"]
            slots_per_row = 4
            "#,
        )
        .unwrap();

        assert_eq!(policy.tariff.rate(), 60.0);
        assert_eq!(policy.layout.slot_count(), 8);
    }

    #[test]
    fn reject_wrong_version() {
        let result = parse_config("config_version = 99");
        assert!(matches!(result, Err(ConfigError::UnsupportedVersion(99))));
    }

    #[test]
    fn reject_negative_tariff() {
        let result = parse_config(
            r#"
            config_version = 1
            [billing]
            tariff_per_minute = -5.0
            "#,
        );
        match result {
            Err(ConfigError::ValidationFailed { errors }) => {
                assert!(matches!(errors[0], ValidationError::InvalidTariff(_)));
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "config_version = 1\n[lot]\nrows = [\"A\"]\nslots_per_row = 2").unwrap();

        let policy = load_config(file.path()).unwrap();
        assert_eq!(policy.layout.rows, vec!["A".to_string()]);
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = load_config("/nonexistent/lotkeeper/config.toml");
        assert!(matches!(result, Err(ConfigError::ReadError(_))));
    }
}
