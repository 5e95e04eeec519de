//! Command types for the lotkeeperd protocol

use lotkeeper_util::{ClientId, LotError, SlotCode};
use serde::{Deserialize, Serialize};

use crate::{
    API_VERSION, CheckInRequest, ClientRole, HealthStatus, HistoricalRecord, LotStateSnapshot,
    OccupancySummary, Session, Slot,
};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&LotError> for ErrorInfo {
    fn from(err: &LotError) -> Self {
        Self::new(ErrorCode::from(err), err.to_string())
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    LotFull,
    DuplicatePlate,
    NotFound,
    InvalidState,
    InvalidTimestamp,
    SlotOccupied,
    PermissionDenied,
    RateLimited,
    ConfigError,
    StoreError,
    InternalError,
}

impl From<&LotError> for ErrorCode {
    fn from(err: &LotError) -> Self {
        match err {
            LotError::LotFull => ErrorCode::LotFull,
            LotError::DuplicatePlate(_) => ErrorCode::DuplicatePlate,
            LotError::NotFound(_) => ErrorCode::NotFound,
            LotError::InvalidState(_) => ErrorCode::InvalidState,
            LotError::InvalidTimestamp(_) => ErrorCode::InvalidTimestamp,
            LotError::SlotOccupied(_) => ErrorCode::SlotOccupied,
            LotError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            LotError::ConfigError(_) => ErrorCode::ConfigError,
            LotError::StoreError(_) => ErrorCode::StoreError,
            LotError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            LotError::RateLimited => ErrorCode::RateLimited,
            LotError::IpcError(_) | LotError::Internal(_) => ErrorCode::InternalError,
        }
    }
}

/// All possible commands from clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get current lot state
    GetState,

    /// Assign the next free slot to a vehicle
    CheckIn(CheckInRequest),

    /// Walk-up check-in by an attendant: entry time is now, no email
    ManualCheckIn { plate: String, driver: String },

    /// Close the vehicle's session and bill it
    CheckOut { plate: String },

    /// Active sessions in slot order
    ListActiveSessions,

    /// All slots in slot order
    ListSlots,

    /// Occupancy counts
    GetSummary,

    /// Most recent completed sessions, newest first
    RecentRecords { limit: usize },

    // Admin commands

    /// Create missing slots `<row>01..<row>NN` for each row
    ProvisionSlots { rows: Vec<String>, per_row: u32 },

    /// Delete a free slot
    RemoveSlot { code: SlotCode },

    /// Subscribe to events (returns immediately, events stream separately)
    SubscribeEvents,

    /// Unsubscribe from events
    UnsubscribeEvents,

    /// Get health status
    GetHealth,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    State(LotStateSnapshot),
    CheckedIn(Session),
    CheckedOut(HistoricalRecord),
    Sessions { sessions: Vec<Session> },
    Slots { slots: Vec<Slot> },
    Summary(OccupancySummary),
    Records { records: Vec<HistoricalRecord> },
    Provisioned { added: Vec<SlotCode> },
    SlotRemoved { code: SlotCode },
    Subscribed { client_id: ClientId },
    Unsubscribed,
    Health(HealthStatus),
    Pong,
}

/// Client connection info (set by IPC layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub client_id: ClientId,
    pub role: ClientRole,
    /// Unix UID if available
    pub uid: Option<u32>,
}

impl ClientInfo {
    pub fn new(role: ClientRole) -> Self {
        Self {
            client_id: ClientId::new(),
            role,
            uid: None,
        }
    }

    pub fn with_uid(mut self, uid: u32) -> Self {
        self.uid = Some(uid);
        self
    }
}
