//! Protocol types for lotkeeperd IPC
//!
//! This crate defines the stable API between lotkeeperd and clients:
//! - Domain types (slots, sessions, historical records, tariff)
//! - Commands (requests from clients)
//! - Responses
//! - Events (service -> clients)
//! - Versioning

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
