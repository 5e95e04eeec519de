//! Store trait definitions

use lotkeeper_api::{HistoricalRecord, Session, Slot};
use lotkeeper_util::{Plate, SlotCode};

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    /// Start a transaction. Dropping the handle without calling
    /// [`StoreTx::commit`] rolls back every change made through it.
    fn begin(&self) -> StoreResult<Box<dyn StoreTx + '_>>;

    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Slot, session and history access inside a transaction
pub trait StoreTx {
    // Slots

    /// Lowest free slot by (row, number)
    fn first_free_slot(&self) -> StoreResult<Option<SlotCode>>;

    fn get_slot(&self, code: &SlotCode) -> StoreResult<Option<Slot>>;

    /// All slots ordered by (row, number)
    fn list_slots(&self) -> StoreResult<Vec<Slot>>;

    /// Insert a free slot. Returns false if the code already exists.
    fn insert_slot(&self, code: &SlotCode) -> StoreResult<bool>;

    /// Returns false if the code does not exist
    fn delete_slot(&self, code: &SlotCode) -> StoreResult<bool>;

    /// Flip a slot from free to occupied. Returns false if the slot is
    /// missing or already occupied.
    fn mark_occupied(&self, code: &SlotCode) -> StoreResult<bool>;

    /// Flip a slot from occupied to free. Returns false if the slot is
    /// missing or already free.
    fn mark_free(&self, code: &SlotCode) -> StoreResult<bool>;

    // Active sessions

    fn find_session(&self, plate: &Plate) -> StoreResult<Option<Session>>;

    fn session_for_slot(&self, code: &SlotCode) -> StoreResult<Option<Session>>;

    fn insert_session(&self, session: &Session) -> StoreResult<()>;

    /// Returns false if no session exists for the plate
    fn delete_session(&self, plate: &Plate) -> StoreResult<bool>;

    /// Active sessions ordered by slot
    fn list_sessions(&self) -> StoreResult<Vec<Session>>;

    // History

    /// Append a completed session; the record's `id` is ignored and the
    /// assigned one returned
    fn insert_record(&self, record: &HistoricalRecord) -> StoreResult<i64>;

    /// Newest first
    fn recent_records(&self, limit: usize) -> StoreResult<Vec<HistoricalRecord>>;

    /// Make every change in this transaction durable
    fn commit(self: Box<Self>) -> StoreResult<()>;
}
