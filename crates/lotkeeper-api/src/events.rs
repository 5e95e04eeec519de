//! Event types for lotkeeperd -> client streaming

use chrono::{DateTime, Local};
use lotkeeper_util::{Plate, SlotCode};
use serde::{Deserialize, Serialize};

use crate::{API_VERSION, HistoricalRecord, LotStateSnapshot};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: lotkeeper_util::now(),
            payload,
        }
    }
}

/// All possible events from the service to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// Full state snapshot (sent after every occupancy change)
    StateChanged(LotStateSnapshot),

    /// A vehicle was assigned a slot
    VehicleCheckedIn {
        plate: Plate,
        slot: SlotCode,
        entry_time: DateTime<Local>,
    },

    /// A vehicle left and was billed
    VehicleCheckedOut { record: HistoricalRecord },

    /// New slots were added to the inventory
    SlotsProvisioned { added: Vec<SlotCode> },

    /// A free slot was removed from the inventory
    SlotRemoved { code: SlotCode },

    /// Service is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::VehicleCheckedIn {
            plate: Plate::new("AB123"),
            slot: SlotCode::new("A", 1).unwrap(),
            entry_time: lotkeeper_util::now(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"vehicle_checked_in\""));
        assert!(json.contains("\"A01\""));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.api_version, API_VERSION);
        assert!(matches!(parsed.payload, EventPayload::VehicleCheckedIn { .. }));
    }
}
