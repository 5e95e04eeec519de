//! Core events emitted by the engine

use lotkeeper_api::{HistoricalRecord, Session};
use lotkeeper_util::SlotCode;

/// Events emitted by the lot engine
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// A vehicle was assigned a slot
    VehicleCheckedIn { session: Session },

    /// A vehicle left; its session was archived and billed
    VehicleCheckedOut { record: HistoricalRecord },

    /// Slots were added to the inventory
    SlotsProvisioned { added: Vec<SlotCode> },

    /// A free slot was deleted
    SlotRemoved { code: SlotCode },
}
