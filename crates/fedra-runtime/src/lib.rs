//! FEDRA Runtime - Federate orchestration
//!
//! This crate drives a federate through its lifecycle:
//! 1. Connect to the runtime (CONSTRUCTED -> INITIALIZED)
//! 2. Join the federation, retrying while it does not exist yet (-> JOINED)
//! 3. Achieve readyToPopulate, run the populate hook
//! 4. Enable time constrained / time regulating
//! 5. Achieve readyToRun, run the simulation hook
//! 6. Achieve readyToResign, resign (-> TERMINATING)
//!
//! Any failure along the way still ends in TERMINATING.

pub mod config;
pub mod join;
pub mod lifecycle;
pub mod logging;

pub use config::*;
pub use join::*;
pub use lifecycle::*;
pub use logging::*;
