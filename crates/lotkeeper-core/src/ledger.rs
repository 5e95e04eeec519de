//! Active sessions, checkout billing and history

use chrono::{DateTime, Datelike, Local};
use lotkeeper_api::{HistoricalRecord, Session, Tariff};
use lotkeeper_store::{Store, StoreTx};
use lotkeeper_util::{LotError, Plate, Result, SlotCode};
use std::sync::Arc;
use tracing::debug;

use crate::registry::invariant_violation;
use crate::{SlotRegistry, compute_fee, elapsed_minutes};

/// Longest driver name accepted at check-in
pub const MAX_DRIVER_LEN: usize = 50;

/// Longest email accepted at check-in
pub const MAX_EMAIL_LEN: usize = 120;

/// Earliest calendar year accepted for a back-dated entry
pub const EARLIEST_ENTRY_YEAR: i32 = 1970;

/// Validated identity of a vehicle being checked in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleDetails {
    pub plate: Plate,
    pub driver: String,
    pub email: Option<String>,
}

impl VehicleDetails {
    /// Trim and validate raw client input. A blank email counts as absent.
    pub fn parse(plate: &str, driver: &str, email: Option<&str>) -> Result<Self> {
        let plate = Plate::parse(plate)?;

        let driver = driver.trim();
        if driver.is_empty() {
            return Err(LotError::invalid_request("driver cannot be empty"));
        }
        if driver.chars().count() > MAX_DRIVER_LEN {
            return Err(LotError::invalid_request(format!(
                "driver name is longer than {} characters",
                MAX_DRIVER_LEN
            )));
        }

        let email = email.map(str::trim).filter(|e| !e.is_empty());
        if let Some(email) = email
            && email.chars().count() > MAX_EMAIL_LEN
        {
            return Err(LotError::invalid_request(format!(
                "email is longer than {} characters",
                MAX_EMAIL_LEN
            )));
        }

        Ok(Self {
            plate,
            driver: driver.to_string(),
            email: email.map(str::to_string),
        })
    }
}

/// Owns active sessions and the history of completed ones
#[derive(Clone)]
pub struct SessionLedger {
    store: Arc<dyn Store>,
    tariff: Tariff,
}

impl SessionLedger {
    pub fn new(store: Arc<dyn Store>, tariff: Tariff) -> Self {
        Self { store, tariff }
    }

    pub fn tariff(&self) -> Tariff {
        self.tariff
    }

    /// Bind a vehicle to an already allocated slot.
    ///
    /// `entry_time` defaults to `now`. It may not be later than `now` or
    /// earlier than [`EARLIEST_ENTRY_YEAR`].
    pub fn open_session(
        &self,
        vehicle: VehicleDetails,
        entry_time: Option<DateTime<Local>>,
        slot: &SlotCode,
        now: DateTime<Local>,
    ) -> Result<Session> {
        let tx = self.store.begin()?;
        let session = Self::open_in(&*tx, vehicle, entry_time, slot, now)?;
        tx.commit()?;
        Ok(session)
    }

    pub(crate) fn open_in(
        tx: &dyn StoreTx,
        vehicle: VehicleDetails,
        entry_time: Option<DateTime<Local>>,
        slot: &SlotCode,
        now: DateTime<Local>,
    ) -> Result<Session> {
        if tx.find_session(&vehicle.plate)?.is_some() {
            return Err(LotError::DuplicatePlate(vehicle.plate));
        }

        let entry_time = match entry_time {
            Some(t) if t > now => {
                return Err(LotError::invalid_timestamp(format!(
                    "entry time {} is in the future",
                    t.to_rfc3339()
                )));
            }
            Some(t) if t.year() < EARLIEST_ENTRY_YEAR => {
                return Err(LotError::invalid_timestamp(format!(
                    "entry time {} is before {}",
                    t.to_rfc3339(),
                    EARLIEST_ENTRY_YEAR
                )));
            }
            Some(t) => t,
            None => now,
        };

        match tx.get_slot(slot)? {
            None => {
                return Err(invariant_violation(format!(
                    "session opened on unknown slot {}",
                    slot
                )));
            }
            Some(s) if !s.occupied => {
                return Err(invariant_violation(format!(
                    "session opened on unallocated slot {}",
                    slot
                )));
            }
            Some(_) => {}
        }
        if let Some(holder) = tx.session_for_slot(slot)? {
            return Err(invariant_violation(format!(
                "slot {} is already bound to {}",
                slot, holder.plate
            )));
        }

        let session = Session {
            plate: vehicle.plate,
            driver: vehicle.driver,
            email: vehicle.email,
            entry_time,
            slot: slot.clone(),
        };
        tx.insert_session(&session)?;
        Ok(session)
    }

    /// Archive and bill the vehicle's session, then free its slot
    pub fn close_session(&self, plate: &Plate, exit_time: DateTime<Local>) -> Result<HistoricalRecord> {
        let tx = self.store.begin()?;
        let record = self.close_in(&*tx, plate, exit_time)?;
        tx.commit()?;
        Ok(record)
    }

    pub(crate) fn close_in(
        &self,
        tx: &dyn StoreTx,
        plate: &Plate,
        exit_time: DateTime<Local>,
    ) -> Result<HistoricalRecord> {
        let session = tx
            .find_session(plate)?
            .ok_or_else(|| LotError::not_found(format!("vehicle {}", plate)))?;

        let duration_minutes = elapsed_minutes(session.entry_time, exit_time)?;
        let fee = compute_fee(duration_minutes, self.tariff);

        let mut record = HistoricalRecord {
            id: 0,
            plate: session.plate,
            driver: session.driver,
            email: session.email,
            entry_time: session.entry_time,
            exit_time,
            duration_minutes,
            fee,
            slot: session.slot,
        };
        record.id = tx.insert_record(&record)?;

        if !tx.delete_session(plate)? {
            return Err(invariant_violation(format!(
                "session for {} vanished during checkout",
                plate
            )));
        }
        SlotRegistry::release_in(tx, &record.slot)?;

        debug!(plate = %plate, record_id = record.id, fee, "Session closed");
        Ok(record)
    }

    /// Active sessions ordered by slot
    pub fn list_active_sessions(&self) -> Result<Vec<Session>> {
        let tx = self.store.begin()?;
        Ok(tx.list_sessions()?)
    }

    pub fn find_session(&self, plate: &Plate) -> Result<Option<Session>> {
        let tx = self.store.begin()?;
        Ok(tx.find_session(plate)?)
    }

    /// Newest first
    pub fn recent_records(&self, limit: usize) -> Result<Vec<HistoricalRecord>> {
        let tx = self.store.begin()?;
        Ok(tx.recent_records(limit)?)
    }
}
