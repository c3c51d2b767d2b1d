//! FEDRA Core - Fundamental types and contracts
//!
//! This crate defines the types shared by every federate component:
//! - Identity (FederateName, FederationName, FederateHandle)
//! - Time primitives (LogicalTime, LookaheadInterval, PollBudget)
//! - Lifecycle state and synchronization points
//! - Interaction-class hierarchy and publish/subscribe classification
//! - The runtime gateway contract and its callback state
//! - Error taxonomy

pub mod id;
pub mod time;
pub mod state;
pub mod class;
pub mod gateway;
pub mod callbacks;
pub mod error;

pub use id::*;
pub use time::*;
pub use state::*;
pub use class::*;
pub use gateway::*;
pub use callbacks::*;
pub use error::*;
