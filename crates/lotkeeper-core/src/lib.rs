//! Slot allocation and billing engine for lotkeeperd
//!
//! This crate is the heart of lotkeeperd, containing:
//! - Slot registry (inventory, occupancy, next-free-slot selection)
//! - Session ledger (active sessions, checkout billing, history)
//! - Lot engine (check-in = allocate + open, checkout = close + archive + release)
//!
//! Every multi-step mutation runs inside one store transaction.

mod billing;
mod engine;
mod events;
mod ledger;
mod registry;

pub use billing::*;
pub use engine::*;
pub use events::*;
pub use ledger::*;
pub use registry::*;
