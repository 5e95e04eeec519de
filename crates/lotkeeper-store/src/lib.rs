//! Persistence layer for lotkeeperd
//!
//! Provides:
//! - Slot inventory with occupancy flags
//! - Active sessions keyed by plate
//! - Append-only history of completed sessions
//! - Audit log (append-only)
//!
//! All slot and session mutations go through a [`StoreTx`] so that
//! multi-step operations commit or roll back as a unit.

mod audit;
mod sqlite;
mod traits;

pub use audit::*;
pub use sqlite::*;
pub use traits::*;

use lotkeeper_util::LotError;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for LotError {
    fn from(e: StoreError) -> Self {
        LotError::store(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
