//! Configuration validation

use crate::schema::{RawBilling, RawConfig, RawLotLayout};
use lotkeeper_api::Tariff;
use lotkeeper_util::validate_row_label;
use std::collections::HashSet;
use thiserror::Error;

/// Largest number of slots a single row may hold
pub const MAX_SLOTS_PER_ROW: u32 = 999;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid tariff {0}: must be between 0 and {max}", max = Tariff::MAX_PER_MINUTE)]
    InvalidTariff(f64),

    #[error("Row '{row}': {message}")]
    InvalidRow { row: String, message: String },

    #[error("Duplicate row label: {0}")]
    DuplicateRow(String),

    #[error("slots_per_row must be between 1 and {max}, got {value}")]
    InvalidSlotsPerRow { value: u32, max: u32 },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    errors.extend(validate_billing(&config.billing));
    errors.extend(validate_layout(&config.lot));
    errors
}

fn validate_billing(billing: &RawBilling) -> Vec<ValidationError> {
    match billing.tariff_per_minute {
        Some(rate) if !Tariff::is_valid_rate(rate) => vec![ValidationError::InvalidTariff(rate)],
        _ => Vec::new(),
    }
}

/// Validate a slot layout. Also used for admin provisioning requests.
pub fn validate_layout(layout: &RawLotLayout) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for row in &layout.rows {
        if let Err(message) = validate_row_label(row) {
            errors.push(ValidationError::InvalidRow {
                row: row.clone(),
                message,
            });
        }
        if !seen.insert(row) {
            errors.push(ValidationError::DuplicateRow(row.clone()));
        }
    }

    if let Some(per_row) = layout.slots_per_row
        && !(1..=MAX_SLOTS_PER_ROW).contains(&per_row)
    {
        errors.push(ValidationError::InvalidSlotsPerRow {
            value: per_row,
            max: MAX_SLOTS_PER_ROW,
        });
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(rows: &[&str], per_row: Option<u32>) -> RawLotLayout {
        RawLotLayout {
            rows: rows.iter().map(|r| r.to_string()).collect(),
            slots_per_row: per_row,
        }
    }

    #[test]
    fn accepts_valid_layout() {
        assert!(validate_layout(&layout(&["A", "B", "AA"], Some(10))).is_empty());
        assert!(validate_layout(&layout(&[], None)).is_empty());
    }

    #[test]
    fn rejects_bad_row_labels() {
        let errors = validate_layout(&layout(&["a", "", "B1"], Some(4)));
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, ValidationError::InvalidRow { .. })));
    }

    #[test]
    fn rejects_duplicate_rows() {
        let errors = validate_layout(&layout(&["A", "B", "A"], Some(4)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateRow(r) if r == "A")));
    }

    #[test]
    fn rejects_slot_counts_out_of_range() {
        assert!(!validate_layout(&layout(&["A"], Some(0))).is_empty());
        assert!(!validate_layout(&layout(&["A"], Some(1000))).is_empty());
        assert!(validate_layout(&layout(&["A"], Some(999))).is_empty());
    }

    #[test]
    fn rejects_bad_tariffs() {
        for rate in [-1.0, f64::NAN, f64::INFINITY, 1e20] {
            let errors = validate_billing(&RawBilling {
                tariff_per_minute: Some(rate),
            });
            assert_eq!(errors.len(), 1);
        }
        assert!(validate_billing(&RawBilling { tariff_per_minute: Some(0.0) }).is_empty());
        assert!(validate_billing(&RawBilling::default()).is_empty());
    }
}
