//! Validated policy structures

use crate::schema::{RawConfig, RawLotLayout, RawServiceConfig};
use lotkeeper_api::Tariff;
use lotkeeper_util::{SlotCode, default_data_dir, default_log_dir, default_socket_path};
use std::path::PathBuf;

/// Slots per row when a layout lists rows without a count
pub const DEFAULT_SLOTS_PER_ROW: u32 = 5;

/// Validated policy ready for use by the engine
#[derive(Debug, Clone, Default)]
pub struct LotPolicy {
    /// Service configuration
    pub service: ServiceConfig,

    /// Billing rate applied at checkout
    pub tariff: Tariff,

    /// Slots provisioned at startup
    pub layout: LotLayout,
}

impl LotPolicy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let tariff = raw
            .billing
            .tariff_per_minute
            .and_then(Tariff::per_minute)
            .unwrap_or_default();

        Self {
            service: ServiceConfig::from_raw(raw.service),
            tariff,
            layout: LotLayout::from_raw(raw.lot),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub socket_path: PathBuf,
    pub log_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw.socket_path.unwrap_or_else(default_socket_path),
            log_dir: raw.log_dir.unwrap_or_else(default_log_dir),
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// Rows of equally sized slot runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LotLayout {
    pub rows: Vec<String>,
    pub slots_per_row: u32,
}

impl LotLayout {
    fn from_raw(raw: RawLotLayout) -> Self {
        Self {
            rows: raw.rows,
            slots_per_row: raw.slots_per_row.unwrap_or(DEFAULT_SLOTS_PER_ROW),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.slots_per_row == 0
    }

    pub fn slot_count(&self) -> usize {
        self.rows.len() * self.slots_per_row as usize
    }

    /// Every slot code in the layout, in slot order per row
    pub fn codes(&self) -> Vec<SlotCode> {
        self.rows
            .iter()
            .flat_map(|row| {
                (1..=self.slots_per_row).filter_map(move |n| SlotCode::new(row.clone(), n).ok())
            })
            .collect()
    }
}
