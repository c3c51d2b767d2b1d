//! FEDRA Time Coordinator - Cooperative time management
//!
//! The runtime confirms policy changes and time grants only through
//! callbacks, and only dispatches callbacks when pumped. This crate wraps
//! that "request, then poll until confirmed" protocol:
//! - Enable time constrained / time regulating (idempotent)
//! - Pump callbacks within a wall-clock budget
//! - Request time advances and record granted logical time
//! - Wait for federation-wide synchronization points

pub mod coordinator;

pub use coordinator::*;
