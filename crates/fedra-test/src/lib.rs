//! FEDRA Test Harness - Scripted federations for lifecycle validation
//!
//! This crate provides:
//! - A scripted runtime gateway with per-call counters
//! - A sleeper that records join retry delays instead of blocking
//! - Interaction-class tree builders and proptest strategies
//! - End-to-end federate scenarios

pub mod fixtures;
pub mod gateway;
pub mod scenario;

pub use fixtures::*;
pub use gateway::*;
pub use scenario::*;
