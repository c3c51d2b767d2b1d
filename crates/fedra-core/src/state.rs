//! Lifecycle state and synchronization points
//!
//! A federate moves strictly forward:
//!
//! ```text
//! Constructed -> Initialized -> Joined -> Terminating
//! ```
//!
//! Any non-terminal state may jump to `Terminating` for an orderly shutdown.
//! Synchronization points are achieved at most once each, in declaration order.

use std::fmt;

use crate::ContractViolation;

/// Federate lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum LifecycleState {
    #[default]
    Constructed,
    Initialized,
    Joined,
    Terminating,
}

impl LifecycleState {
    /// Is `next` a legal successor of this state?
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Constructed, Initialized)
                | (Initialized, Joined)
                | (Constructed | Initialized | Joined, Terminating)
        )
    }

    /// Checked transition
    pub fn transition(self, next: LifecycleState) -> Result<LifecycleState, ContractViolation> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ContractViolation::IllegalTransition {
                from: self,
                to: next,
            })
        }
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Terminating
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Constructed => "CONSTRUCTED",
            LifecycleState::Initialized => "INITIALIZED",
            LifecycleState::Joined => "JOINED",
            LifecycleState::Terminating => "TERMINATING",
        };
        f.write_str(s)
    }
}

/// Federation-wide synchronization points, in the order they are achieved
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncPoint {
    ReadyToPopulate,
    ReadyToRun,
    ReadyToResign,
}

impl SyncPoint {
    pub const ALL: [SyncPoint; 3] = [
        SyncPoint::ReadyToPopulate,
        SyncPoint::ReadyToRun,
        SyncPoint::ReadyToResign,
    ];

    /// Label registered with the federation
    pub fn label(self) -> &'static str {
        match self {
            SyncPoint::ReadyToPopulate => "readyToPopulate",
            SyncPoint::ReadyToRun => "readyToRun",
            SyncPoint::ReadyToResign => "readyToResign",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        SyncPoint::ALL.into_iter().find(|p| p.label() == label)
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for SyncPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tracks which synchronization points this federate has achieved
#[derive(Clone, Debug, Default)]
pub struct SyncPointTracker {
    achieved: usize,
}

impl SyncPointTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next point that may legally be achieved
    pub fn next(&self) -> Option<SyncPoint> {
        SyncPoint::ALL.get(self.achieved).copied()
    }

    pub fn is_achieved(&self, point: SyncPoint) -> bool {
        point.index() < self.achieved
    }

    /// Record `point` as achieved, rejecting repeats and skips
    pub fn achieve(&mut self, point: SyncPoint) -> Result<(), ContractViolation> {
        if self.is_achieved(point) {
            return Err(ContractViolation::SyncPointRepeated(point));
        }
        if self.next() != Some(point) {
            return Err(ContractViolation::SyncPointOutOfOrder {
                point,
                expected: self.next(),
            });
        }
        self.achieved += 1;
        Ok(())
    }
}
