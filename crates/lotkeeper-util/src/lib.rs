//! Shared utilities for lotkeeper
//!
//! This crate provides:
//! - Identifier types (Plate, SlotCode, ClientId)
//! - Time utilities (mockable wall clock, elapsed minutes)
//! - Error types
//! - Rate limiting helpers
//! - Default paths for socket, config, data, and log directories

mod error;
mod ids;
mod paths;
mod rate_limit;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
