//! Error types for FEDRA federates

use std::fmt;

use thiserror::Error;

use crate::{LifecycleState, LogicalTime, SyncPoint};

/// Failures reported by the runtime gateway
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Federation execution does not exist: {0}")]
    FederationExecutionDoesNotExist(String),

    #[error("Runtime busy: {0}")]
    Busy(String),

    #[error("Runtime internal error: {0}")]
    Internal(String),

    #[error("Not connected to the runtime")]
    NotConnected,

    #[error("Invalid federate name: {0}")]
    InvalidFederateName(String),

    #[error("Federate name already in use: {0}")]
    FederateNameInUse(String),

    #[error("Federate already joined a federation execution")]
    AlreadyJoined,

    #[error("Invalid lookahead: {0}")]
    InvalidLookahead(f64),

    #[error("Call not allowed from within a callback")]
    CallNotAllowedFromWithinCallback,

    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// Recoverable failures are worth retrying a join for: the federation
    /// may simply not have been created yet, or the runtime is momentarily busy
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GatewayError::FederationExecutionDoesNotExist(_)
                | GatewayError::Busy(_)
                | GatewayError::Internal(_)
        )
    }
}

/// Result type for gateway calls
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Programming errors: the lifecycle was driven out of order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    #[error("Illegal lifecycle transition {from} -> {to}")]
    IllegalTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    #[error("Operation requires state {required}, federate is {actual}")]
    WrongState {
        required: LifecycleState,
        actual: LifecycleState,
    },

    #[error("Synchronization point {point} out of order (expected {expected:?})")]
    SyncPointOutOfOrder {
        point: SyncPoint,
        expected: Option<SyncPoint>,
    },

    #[error("Synchronization point {0} already achieved")]
    SyncPointRepeated(SyncPoint),

    #[error("Time advance already in progress")]
    AdvanceInProgress,
}

/// Time-management operation that failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeOperation {
    EnableConstrained,
    EnableRegulating,
    EnableAsynchronousDelivery,
    AdvanceTime,
    Synchronize(SyncPoint),
}

impl fmt::Display for TimeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeOperation::EnableConstrained => f.write_str("enabling time constrained"),
            TimeOperation::EnableRegulating => f.write_str("enabling time regulation"),
            TimeOperation::EnableAsynchronousDelivery => {
                f.write_str("enabling asynchronous delivery")
            }
            TimeOperation::AdvanceTime => f.write_str("advancing time"),
            TimeOperation::Synchronize(point) => write!(f, "synchronizing on {}", point),
        }
    }
}

/// Error raised by a user-supplied application hook
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core FEDRA errors
#[derive(Error, Debug)]
pub enum FederateError {
    // Join errors
    #[error("Recoverable join failure: {0}")]
    RecoverableJoin(#[source] GatewayError),

    #[error("Join exhausted after {attempts} attempts: {last}")]
    JoinExhausted {
        attempts: u32,
        #[source]
        last: GatewayError,
    },

    #[error("Join rejected: {0}")]
    JoinRejected(#[source] GatewayError),

    // Time management errors
    #[error("Time management failure while {operation}: {source}")]
    TimeManagement {
        operation: TimeOperation,
        #[source]
        source: GatewayError,
    },

    #[error("Gave up {operation} after {polls} polls")]
    PollLimitExceeded { operation: TimeOperation, polls: u64 },

    #[error("Granted time {granted} is behind logical time {current}")]
    NonMonotonicGrant {
        granted: LogicalTime,
        current: LogicalTime,
    },

    // Lifecycle errors
    #[error("Contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),

    #[error("Hook {point} failed: {source}")]
    Hook {
        point: SyncPoint,
        #[source]
        source: HookError,
    },

    // Config errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Gateway error: {0}")]
    Gateway(#[source] GatewayError),
}

impl FederateError {
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, FederateError::ContractViolation(_))
    }
}

/// Result type for FEDRA operations
pub type FederateResult<T> = Result<T, FederateError>;
