//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Billing settings
    #[serde(default)]
    pub billing: RawBilling,

    /// Slot layout provisioned at startup
    #[serde(default)]
    pub lot: RawLotLayout,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path
    pub socket_path: Option<PathBuf>,

    /// Log directory
    pub log_dir: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,
}

/// Billing settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawBilling {
    /// Currency units charged per minute parked
    pub tariff_per_minute: Option<f64>,
}

/// Lot layout: `slots_per_row` slots in each of `rows`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLotLayout {
    /// Row labels, e.g. ["A", "B", "C"]
    #[serde(default)]
    pub rows: Vec<String>,

    /// Number of slots in each row
    pub slots_per_row: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            config_version = 1

            [service]
            data_dir = "/var/lib/lotkeeper"

            [billing]
            tariff_per_minute = 45.5

            [lot]
            rows = ["A", "B", "C", "D"]
            slots_per_row = 4
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.billing.tariff_per_minute, Some(45.5));
        assert_eq!(config.lot.rows.len(), 4);
        assert_eq!(config.lot.slots_per_row, Some(4));
        assert_eq!(
            config.service.data_dir,
            Some(PathBuf::from("/var/lib/lotkeeper"))
        );
    }

    #[test]
    fn sections_are_optional() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.billing.tariff_per_minute.is_none());
        assert!(config.lot.rows.is_empty());
        assert!(config.service.socket_path.is_none());
    }
}
