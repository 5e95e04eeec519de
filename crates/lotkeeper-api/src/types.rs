//! Shared types for the lotkeeper API

use chrono::{DateTime, Local};
use lotkeeper_util::{Plate, SlotCode};
use serde::{Deserialize, Serialize};

/// Billing rate in currency units per minute
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tariff(f64);

impl Tariff {
    /// Rate used when nothing is configured
    pub const DEFAULT_PER_MINUTE: f64 = 50.0;

    /// Highest accepted rate
    pub const MAX_PER_MINUTE: f64 = 1_000_000.0;

    /// Returns None unless `0 <= rate <= MAX_PER_MINUTE`
    pub fn per_minute(rate: f64) -> Option<Self> {
        if Self::is_valid_rate(rate) {
            Some(Self(rate))
        } else {
            None
        }
    }

    pub fn is_valid_rate(rate: f64) -> bool {
        (0.0..=Self::MAX_PER_MINUTE).contains(&rate)
    }

    pub fn rate(&self) -> f64 {
        self.0
    }
}

impl Default for Tariff {
    fn default() -> Self {
        Self(Self::DEFAULT_PER_MINUTE)
    }
}

/// A physical parking space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub code: SlotCode,
    pub occupied: bool,
}

impl Slot {
    pub fn row(&self) -> &str {
        self.code.row()
    }

    pub fn number(&self) -> u32 {
        self.code.number()
    }
}

/// An active parking session: a vehicle bound to a slot since `entry_time`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub plate: Plate,
    pub driver: String,
    pub email: Option<String>,
    pub entry_time: DateTime<Local>,
    pub slot: SlotCode,
}

/// Archive of a completed session.
///
/// Produced once when the session is closed; `duration_minutes` and `fee`
/// are derived from the timestamps and the tariff in force at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    /// Assigned by the store
    pub id: i64,
    pub plate: Plate,
    pub driver: String,
    pub email: Option<String>,
    pub entry_time: DateTime<Local>,
    pub exit_time: DateTime<Local>,
    pub duration_minutes: f64,
    pub fee: u64,
    /// Slot the vehicle occupied when it left
    pub slot: SlotCode,
}

/// Check-in details as submitted by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRequest {
    pub plate: String,
    pub driver: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Defaults to the current time. Must not be in the future.
    #[serde(default)]
    pub entry_time: Option<DateTime<Local>>,
}

/// Occupancy of a single row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowOccupancy {
    pub row: String,
    pub total: usize,
    pub occupied: usize,
}

/// Lot-wide occupancy counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySummary {
    pub total: usize,
    pub occupied: usize,
    pub free: usize,
    /// Rows in label order
    pub rows: Vec<RowOccupancy>,
}

impl OccupancySummary {
    /// Tally a slot listing
    pub fn from_slots<'a>(slots: impl IntoIterator<Item = &'a Slot>) -> Self {
        let mut summary = Self::default();
        for slot in slots {
            summary.total += 1;
            if slot.occupied {
                summary.occupied += 1;
            }

            let idx = match summary.rows.iter().position(|r| r.row == slot.row()) {
                Some(idx) => idx,
                None => {
                    summary.rows.push(RowOccupancy {
                        row: slot.row().to_string(),
                        total: 0,
                        occupied: 0,
                    });
                    summary.rows.len() - 1
                }
            };
            let row = &mut summary.rows[idx];
            row.total += 1;
            if slot.occupied {
                row.occupied += 1;
            }
        }
        summary.free = summary.total - summary.occupied;
        summary.rows.sort_by(|a, b| a.row.cmp(&b.row));
        summary
    }

    pub fn is_full(&self) -> bool {
        self.free == 0
    }
}

/// Full service state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotStateSnapshot {
    pub api_version: u32,
    pub tariff: Tariff,
    pub summary: OccupancySummary,
    pub active_sessions: usize,
}

/// Role for authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientRole {
    /// Gate terminal or operator console: check vehicles in and out
    Attendant,
    /// Local admin: can also provision and remove slots
    Admin,
    /// Peer of unknown identity: listings and state only
    Observer,
}

impl ClientRole {
    pub fn can_check_in(&self) -> bool {
        matches!(self, ClientRole::Attendant | ClientRole::Admin)
    }

    pub fn can_check_out(&self) -> bool {
        matches!(self, ClientRole::Attendant | ClientRole::Admin)
    }

    pub fn can_manage_slots(&self) -> bool {
        matches!(self, ClientRole::Admin)
    }
}

/// Health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub live: bool,
    pub ready: bool,
    pub store_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(code: &str, occupied: bool) -> Slot {
        Slot {
            code: code.parse().unwrap(),
            occupied,
        }
    }

    #[test]
    fn tariff_rejects_invalid_rates() {
        assert!(Tariff::per_minute(50.0).is_some());
        assert!(Tariff::per_minute(0.0).is_some());
        assert!(Tariff::per_minute(-1.0).is_none());
        assert!(Tariff::per_minute(f64::NAN).is_none());
        assert!(Tariff::per_minute(f64::INFINITY).is_none());
        assert!(Tariff::per_minute(Tariff::MAX_PER_MINUTE).is_some());
        assert!(Tariff::per_minute(1e20).is_none());
        assert_eq!(Tariff::default().rate(), 50.0);
    }

    #[test]
    fn summary_counts_rows() {
        let slots = vec![
            slot("B01", true),
            slot("A01", true),
            slot("A02", false),
            slot("B02", true),
        ];

        let summary = OccupancySummary::from_slots(&slots);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.occupied, 3);
        assert_eq!(summary.free, 1);
        assert!(!summary.is_full());
        assert_eq!(
            summary.rows,
            vec![
                RowOccupancy { row: "A".into(), total: 2, occupied: 1 },
                RowOccupancy { row: "B".into(), total: 2, occupied: 2 },
            ]
        );
    }

    #[test]
    fn check_in_request_optional_fields() {
        let req: CheckInRequest =
            serde_json::from_str(r#"{"plate":"AB123","driver":"Ana"}"#).unwrap();
        assert!(req.email.is_none());
        assert!(req.entry_time.is_none());
    }

    #[test]
    fn role_permissions() {
        assert!(ClientRole::Attendant.can_check_in());
        assert!(!ClientRole::Attendant.can_manage_slots());
        assert!(ClientRole::Admin.can_manage_slots());
        assert!(!ClientRole::Observer.can_check_out());
    }
}
