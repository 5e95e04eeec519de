//! IPC layer for lotkeeperd
//!
//! Provides:
//! - Unix domain socket server
//! - NDJSON (newline-delimited JSON) protocol
//! - Client connection management
//! - Peer UID based roles

mod client;
mod server;

pub use client::*;
pub use server::*;

use lotkeeper_api::ErrorInfo;
use lotkeeper_util::LotError;
use thiserror::Error;

/// IPC errors
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Request rejected ({:?}): {}", .0.code, .0.message)]
    Rejected(ErrorInfo),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl From<IpcError> for LotError {
    fn from(e: IpcError) -> Self {
        LotError::ipc(e.to_string())
    }
}

pub type IpcResult<T> = Result<T, IpcError>;
