//! Audit event types

use chrono::{DateTime, Local};
use lotkeeper_util::{Plate, SlotCode};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// Slots added to the inventory
    SlotsProvisioned { added: Vec<SlotCode> },

    /// Free slot removed from the inventory
    SlotRemoved { code: SlotCode },

    /// Vehicle assigned a slot
    VehicleCheckedIn {
        plate: Plate,
        slot: SlotCode,
        entry_time: DateTime<Local>,
    },

    /// Vehicle left and was billed
    VehicleCheckedOut {
        plate: Plate,
        slot: SlotCode,
        record_id: i64,
        duration_minutes: f64,
        fee: u64,
    },

    /// Check-in refused (lot full, duplicate plate, bad input)
    CheckInRejected { plate: String, reason: String },

    /// Client connected
    ClientConnected {
        client_id: String,
        role: String,
        uid: Option<u32>,
    },

    /// Client disconnected
    ClientDisconnected { client_id: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: lotkeeper_util::now(),
            event,
        }
    }
}
