//! Error types for lotkeeper

use thiserror::Error;

use crate::{Plate, SlotCode};

/// Core error type for lotkeeper operations
#[derive(Debug, Error)]
pub enum LotError {
    #[error("Parking lot is full")]
    LotFull,

    #[error("Vehicle {0} is already checked in")]
    DuplicatePlate(Plate),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A core invariant was violated. Indicates a bug, never retry.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Slot {0} is occupied")]
    SlotOccupied(SlotCode),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("IPC error: {0}")]
    IpcError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LotError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn invalid_timestamp(msg: impl Into<String>) -> Self {
        Self::InvalidTimestamp(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::IpcError(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::PermissionDenied(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short stable label for logs and audit entries
    pub fn as_label(&self) -> &'static str {
        match self {
            LotError::LotFull => "lot_full",
            LotError::DuplicatePlate(_) => "duplicate_plate",
            LotError::NotFound(_) => "not_found",
            LotError::InvalidState(_) => "invalid_state",
            LotError::InvalidTimestamp(_) => "invalid_timestamp",
            LotError::SlotOccupied(_) => "slot_occupied",
            LotError::InvalidRequest(_) => "invalid_request",
            LotError::ConfigError(_) => "config_error",
            LotError::StoreError(_) => "store_error",
            LotError::IpcError(_) => "ipc_error",
            LotError::PermissionDenied(_) => "permission_denied",
            LotError::RateLimited => "rate_limited",
            LotError::Internal(_) => "internal",
        }
    }

    /// True for errors that signal a broken invariant rather than a bad request
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, LotError::InvalidState(_))
    }
}

pub type Result<T> = std::result::Result<T, LotError>;
