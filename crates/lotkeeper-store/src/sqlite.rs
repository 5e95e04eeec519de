//! SQLite-based store implementation

use chrono::{DateTime, Datelike, Local};
use lotkeeper_api::{HistoricalRecord, Session, Slot};
use lotkeeper_util::{Plate, SlotCode};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{AuditEvent, AuditEventType, Store, StoreError, StoreResult, StoreTx};

/// Database filename inside the data directory
pub const DB_FILENAME: &str = "lotkeeper.db";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- Slot inventory
            CREATE TABLE IF NOT EXISTS slots (
                code TEXT PRIMARY KEY,
                row_label TEXT NOT NULL,
                number INTEGER NOT NULL,
                occupied INTEGER NOT NULL DEFAULT 0,
                UNIQUE (row_label, number)
            );

            -- Active sessions, one per plate and one per slot
            CREATE TABLE IF NOT EXISTS sessions (
                plate TEXT PRIMARY KEY,
                driver TEXT NOT NULL,
                email TEXT,
                entry_time TEXT NOT NULL,
                slot_code TEXT NOT NULL UNIQUE REFERENCES slots(code)
            );

            -- Completed sessions (append-only)
            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plate TEXT NOT NULL,
                driver TEXT NOT NULL,
                email TEXT,
                entry_time TEXT NOT NULL,
                exit_time TEXT NOT NULL,
                duration_minutes REAL NOT NULL,
                fee INTEGER NOT NULL,
                slot_code TEXT NOT NULL
            );

            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                event_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_slots_free ON slots(occupied, row_label, number);
            CREATE INDEX IF NOT EXISTS idx_history_plate ON history(plate);
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn begin(&self) -> StoreResult<Box<dyn StoreTx + '_>> {
        let conn = self.conn()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteTx {
            conn,
            finished: false,
        }))
    }

    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![format_timestamp(&event.timestamp)?, event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;
            events.push(AuditEvent {
                id,
                timestamp: parse_timestamp(&timestamp_str)?,
                event,
            });
        }

        Ok(events)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

/// Open `BEGIN IMMEDIATE` transaction holding the connection lock
struct SqliteTx<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl Drop for SqliteTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "Rollback failed");
            } else {
                debug!("Transaction rolled back");
            }
        }
    }
}

const SLOT_COLUMNS: &str = "row_label, number, occupied";
const SESSION_COLUMNS: &str = "plate, driver, email, entry_time, slot_code";
const RECORD_COLUMNS: &str =
    "id, plate, driver, email, entry_time, exit_time, duration_minutes, fee, slot_code";

impl StoreTx for SqliteTx<'_> {
    fn first_free_slot(&self) -> StoreResult<Option<SlotCode>> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT row_label, number FROM slots WHERE occupied = 0 \
                 ORDER BY row_label, number LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(label, number)| slot_code(label, number)).transpose()
    }

    fn get_slot(&self, code: &SlotCode) -> StoreResult<Option<Slot>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM slots WHERE code = ?", SLOT_COLUMNS),
                [code.to_string()],
                SlotRow::read,
            )
            .optional()?;

        raw.map(SlotRow::into_slot).transpose()
    }

    fn list_slots(&self) -> StoreResult<Vec<Slot>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM slots ORDER BY row_label, number",
            SLOT_COLUMNS
        ))?;
        let rows = stmt.query_map([], SlotRow::read)?;

        let mut slots = Vec::new();
        for row in rows {
            slots.push(row?.into_slot()?);
        }
        Ok(slots)
    }

    fn insert_slot(&self, code: &SlotCode) -> StoreResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO slots (code, row_label, number, occupied) VALUES (?, ?, ?, 0)",
            params![code.to_string(), code.row(), code.number()],
        )?;
        Ok(inserted == 1)
    }

    fn delete_slot(&self, code: &SlotCode) -> StoreResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM slots WHERE code = ?", [code.to_string()])?;
        Ok(deleted == 1)
    }

    fn mark_occupied(&self, code: &SlotCode) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE slots SET occupied = 1 WHERE code = ? AND occupied = 0",
            [code.to_string()],
        )?;
        Ok(changed == 1)
    }

    fn mark_free(&self, code: &SlotCode) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE slots SET occupied = 0 WHERE code = ? AND occupied = 1",
            [code.to_string()],
        )?;
        Ok(changed == 1)
    }

    fn find_session(&self, plate: &Plate) -> StoreResult<Option<Session>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE plate = ?", SESSION_COLUMNS),
                [plate.as_str()],
                SessionRow::read,
            )
            .optional()?;

        raw.map(SessionRow::into_session).transpose()
    }

    fn session_for_slot(&self, code: &SlotCode) -> StoreResult<Option<Session>> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {} FROM sessions WHERE slot_code = ?", SESSION_COLUMNS),
                [code.to_string()],
                SessionRow::read,
            )
            .optional()?;

        raw.map(SessionRow::into_session).transpose()
    }

    fn insert_session(&self, session: &Session) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO sessions (plate, driver, email, entry_time, slot_code) \
             VALUES (?, ?, ?, ?, ?)",
            params![
                session.plate.as_str(),
                session.driver,
                session.email,
                format_timestamp(&session.entry_time)?,
                session.slot.to_string(),
            ],
        )?;
        debug!(plate = %session.plate, slot = %session.slot, "Session stored");
        Ok(())
    }

    fn delete_session(&self, plate: &Plate) -> StoreResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM sessions WHERE plate = ?", [plate.as_str()])?;
        Ok(deleted == 1)
    }

    fn list_sessions(&self) -> StoreResult<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.plate, s.driver, s.email, s.entry_time, s.slot_code \
             FROM sessions s JOIN slots p ON p.code = s.slot_code \
             ORDER BY p.row_label, p.number",
        )?;
        let rows = stmt.query_map([], SessionRow::read)?;

        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_session()?);
        }
        Ok(sessions)
    }

    fn insert_record(&self, record: &HistoricalRecord) -> StoreResult<i64> {
        let fee = i64::try_from(record.fee)
            .map_err(|_| StoreError::Serialization(format!("fee {} out of range", record.fee)))?;

        self.conn.execute(
            "INSERT INTO history \
             (plate, driver, email, entry_time, exit_time, duration_minutes, fee, slot_code) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.plate.as_str(),
                record.driver,
                record.email,
                format_timestamp(&record.entry_time)?,
                format_timestamp(&record.exit_time)?,
                record.duration_minutes,
                fee,
                record.slot.to_string(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        debug!(record_id = id, plate = %record.plate, "History record appended");
        Ok(id)
    }

    fn recent_records(&self, limit: usize) -> StoreResult<Vec<HistoricalRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM history ORDER BY id DESC LIMIT ?",
            RECORD_COLUMNS
        ))?;
        let rows = stmt.query_map([limit], RecordRow::read)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }
}

// Raw rows are read inside rusqlite callbacks, then converted outside them
// so that conversion failures surface as StoreError.

struct SlotRow {
    row_label: String,
    number: i64,
    occupied: bool,
}

impl SlotRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            row_label: row.get(0)?,
            number: row.get(1)?,
            occupied: row.get(2)?,
        })
    }

    fn into_slot(self) -> StoreResult<Slot> {
        Ok(Slot {
            code: slot_code(self.row_label, self.number)?,
            occupied: self.occupied,
        })
    }
}

struct SessionRow {
    plate: String,
    driver: String,
    email: Option<String>,
    entry_time: String,
    slot_code: String,
}

impl SessionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            plate: row.get(0)?,
            driver: row.get(1)?,
            email: row.get(2)?,
            entry_time: row.get(3)?,
            slot_code: row.get(4)?,
        })
    }

    fn into_session(self) -> StoreResult<Session> {
        Ok(Session {
            plate: Plate::new(self.plate),
            driver: self.driver,
            email: self.email,
            entry_time: parse_timestamp(&self.entry_time)?,
            slot: parse_slot_code(&self.slot_code)?,
        })
    }
}

struct RecordRow {
    id: i64,
    plate: String,
    driver: String,
    email: Option<String>,
    entry_time: String,
    exit_time: String,
    duration_minutes: f64,
    fee: i64,
    slot_code: String,
}

impl RecordRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            plate: row.get(1)?,
            driver: row.get(2)?,
            email: row.get(3)?,
            entry_time: row.get(4)?,
            exit_time: row.get(5)?,
            duration_minutes: row.get(6)?,
            fee: row.get(7)?,
            slot_code: row.get(8)?,
        })
    }

    fn into_record(self) -> StoreResult<HistoricalRecord> {
        let fee = u64::try_from(self.fee)
            .map_err(|_| StoreError::Serialization(format!("negative fee {}", self.fee)))?;

        Ok(HistoricalRecord {
            id: self.id,
            plate: Plate::new(self.plate),
            driver: self.driver,
            email: self.email,
            entry_time: parse_timestamp(&self.entry_time)?,
            exit_time: parse_timestamp(&self.exit_time)?,
            duration_minutes: self.duration_minutes,
            fee,
            slot: parse_slot_code(&self.slot_code)?,
        })
    }
}

/// RFC 3339 text for `dt`. Years outside 0000-9999 have no RFC 3339 form
/// and would not parse back, so they are refused.
fn format_timestamp(dt: &DateTime<Local>) -> StoreResult<String> {
    if !(0..=9999).contains(&dt.year()) {
        return Err(StoreError::Serialization(format!(
            "timestamp {} is outside years 0000-9999",
            dt
        )));
    }
    Ok(dt.to_rfc3339())
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Local>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Local))
        .map_err(|e| StoreError::Serialization(format!("bad timestamp '{}': {}", s, e)))
}

fn parse_slot_code(s: &str) -> StoreResult<SlotCode> {
    s.parse()
        .map_err(|e| StoreError::Serialization(format!("bad slot code '{}': {}", s, e)))
}

fn slot_code(row_label: String, number: i64) -> StoreResult<SlotCode> {
    let number = u32::try_from(number)
        .map_err(|_| StoreError::Serialization(format!("bad slot number {}", number)))?;
    SlotCode::new(row_label, number).map_err(|e| StoreError::Serialization(e.to_string()))
}
