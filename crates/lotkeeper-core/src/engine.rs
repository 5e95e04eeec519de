//! Check-in / checkout orchestration

use chrono::{DateTime, Local};
use lotkeeper_api::{
    API_VERSION, CheckInRequest, HistoricalRecord, LotStateSnapshot, OccupancySummary, Session,
    Slot, Tariff,
};
use lotkeeper_store::{AuditEvent, AuditEventType, Store};
use lotkeeper_util::{LotError, Plate, Result, SlotCode};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{CoreEvent, SessionLedger, SlotRegistry, VehicleDetails};

/// The lot engine: the single owner of check-in and checkout.
///
/// Check-in allocates a slot and opens a session in one transaction;
/// checkout archives, bills and releases in one transaction. Successful
/// mutations queue a [`CoreEvent`] for the service to broadcast and append
/// an audit entry once committed.
pub struct LotEngine {
    store: Arc<dyn Store>,
    registry: SlotRegistry,
    ledger: SessionLedger,
    pending_events: Vec<CoreEvent>,
}

impl LotEngine {
    pub fn new(store: Arc<dyn Store>, tariff: Tariff) -> Self {
        info!(tariff = tariff.rate(), "Lot engine initialized");

        Self {
            registry: SlotRegistry::new(store.clone()),
            ledger: SessionLedger::new(store.clone(), tariff),
            store,
            pending_events: Vec::new(),
        }
    }

    pub fn tariff(&self) -> Tariff {
        self.ledger.tariff()
    }

    /// Events produced since the last call
    pub fn drain_events(&mut self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Check a vehicle in to the next free slot
    pub fn check_in(&mut self, request: CheckInRequest, now: DateTime<Local>) -> Result<Session> {
        let result = VehicleDetails::parse(&request.plate, &request.driver, request.email.as_deref())
            .and_then(|vehicle| self.admit(vehicle, request.entry_time, now));
        self.finish_check_in(&request.plate, result)
    }

    /// Walk-up check-in: next free slot, entry time now, no email
    pub fn manual_check_in(
        &mut self,
        plate: &str,
        driver: &str,
        now: DateTime<Local>,
    ) -> Result<Session> {
        let result = VehicleDetails::parse(plate, driver, None)
            .and_then(|vehicle| self.admit(vehicle, None, now));
        self.finish_check_in(plate, result)
    }

    fn admit(
        &self,
        vehicle: VehicleDetails,
        entry_time: Option<DateTime<Local>>,
        now: DateTime<Local>,
    ) -> Result<Session> {
        let tx = self.store.begin()?;
        let slot = SlotRegistry::allocate_in(&*tx)?.ok_or(LotError::LotFull)?;
        let session = SessionLedger::open_in(&*tx, vehicle, entry_time, &slot.code, now)?;
        tx.commit()?;
        Ok(session)
    }

    fn finish_check_in(&mut self, plate: &str, result: Result<Session>) -> Result<Session> {
        match result {
            Ok(session) => {
                info!(
                    plate = %session.plate,
                    slot = %session.slot,
                    entry_time = %session.entry_time,
                    "Vehicle checked in"
                );
                self.audit(AuditEventType::VehicleCheckedIn {
                    plate: session.plate.clone(),
                    slot: session.slot.clone(),
                    entry_time: session.entry_time,
                });
                self.pending_events.push(CoreEvent::VehicleCheckedIn {
                    session: session.clone(),
                });
                Ok(session)
            }
            Err(e) => {
                if !e.is_invariant_violation() {
                    warn!(plate = %plate, reason = e.as_label(), error = %e, "Check-in rejected");
                }
                self.audit(AuditEventType::CheckInRejected {
                    plate: plate.trim().to_string(),
                    reason: e.as_label().to_string(),
                });
                Err(e)
            }
        }
    }

    /// Close the vehicle's session, bill it and free its slot
    pub fn check_out(&mut self, plate: &str, now: DateTime<Local>) -> Result<HistoricalRecord> {
        let plate = Plate::parse(plate)?;

        let tx = self.store.begin()?;
        let record = self.ledger.close_in(&*tx, &plate, now)?;
        tx.commit()?;

        info!(
            plate = %record.plate,
            slot = %record.slot,
            minutes = record.duration_minutes,
            fee = record.fee,
            "Vehicle checked out"
        );
        self.audit(AuditEventType::VehicleCheckedOut {
            plate: record.plate.clone(),
            slot: record.slot.clone(),
            record_id: record.id,
            duration_minutes: record.duration_minutes,
            fee: record.fee,
        });
        self.pending_events.push(CoreEvent::VehicleCheckedOut {
            record: record.clone(),
        });

        Ok(record)
    }

    /// Create missing slots for each row; returns the codes added
    pub fn provision(&mut self, rows: &[String], per_row: u32) -> Result<Vec<SlotCode>> {
        let added = self.registry.provision(rows, per_row)?;
        if !added.is_empty() {
            self.audit(AuditEventType::SlotsProvisioned {
                added: added.clone(),
            });
            self.pending_events.push(CoreEvent::SlotsProvisioned {
                added: added.clone(),
            });
        }
        Ok(added)
    }

    /// Delete a free slot
    pub fn remove_slot(&mut self, code: &SlotCode) -> Result<()> {
        self.registry.remove_slot(code)?;
        self.audit(AuditEventType::SlotRemoved { code: code.clone() });
        self.pending_events
            .push(CoreEvent::SlotRemoved { code: code.clone() });
        Ok(())
    }

    pub fn active_sessions(&self) -> Result<Vec<Session>> {
        self.ledger.list_active_sessions()
    }

    pub fn find_session(&self, plate: &Plate) -> Result<Option<Session>> {
        self.ledger.find_session(plate)
    }

    pub fn slots(&self) -> Result<Vec<Slot>> {
        self.registry.list_slots()
    }

    pub fn summary(&self) -> Result<OccupancySummary> {
        self.registry.summary()
    }

    pub fn recent_records(&self, limit: usize) -> Result<Vec<HistoricalRecord>> {
        self.ledger.recent_records(limit)
    }

    /// Snapshot for clients
    pub fn get_state(&self) -> Result<LotStateSnapshot> {
        let tx = self.store.begin()?;
        let summary = OccupancySummary::from_slots(&tx.list_slots()?);
        let active_sessions = tx.list_sessions()?.len();

        Ok(LotStateSnapshot {
            api_version: API_VERSION,
            tariff: self.tariff(),
            summary,
            active_sessions,
        })
    }

    pub fn is_store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}
