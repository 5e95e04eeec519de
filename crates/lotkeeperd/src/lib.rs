//! lotkeeperd request handling
//!
//! The service binary owns sockets and signals; this library holds the
//! part that turns protocol commands into engine calls and engine events
//! into protocol events, plus the log file setup.

pub mod dispatch;
pub mod logging;
