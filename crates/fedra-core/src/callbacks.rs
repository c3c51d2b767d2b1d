//! Callback state shared between the federate core and the runtime
//!
//! The runtime reports confirmations here, possibly from its own threads.
//! The core only ever reads these flags from its poll loops, so a plain
//! atomic load is all the synchronization the loops need.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::{LogicalTime, SyncPoint};

/// Federate-side receiver for runtime callbacks
#[derive(Debug, Default)]
pub struct FederateCallbacks {
    time_constrained: AtomicBool,
    time_regulating: AtomicBool,
    /// Set while a callback pump is running
    pumping: AtomicBool,
    /// Set while a time-advance request is outstanding
    advancing: AtomicBool,
    granted: Mutex<Option<LogicalTime>>,
    synchronized: Mutex<HashSet<SyncPoint>>,
}

impl FederateCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Callbacks invoked by the runtime
    // ------------------------------------------------------------------

    pub fn on_time_constrained_enabled(&self) {
        debug!("time constrained enabled");
        self.time_constrained.store(true, Ordering::Release);
    }

    pub fn on_time_regulation_enabled(&self) {
        debug!("time regulation enabled");
        self.time_regulating.store(true, Ordering::Release);
    }

    pub fn on_time_advance_grant(&self, time: LogicalTime) {
        debug!(%time, "time advance granted");
        *self.granted.lock() = Some(time);
    }

    /// A synchronization label we do not know is ignored
    pub fn on_federation_synchronized(&self, label: &str) {
        match SyncPoint::from_label(label) {
            Some(point) => {
                debug!(%point, "federation synchronized");
                self.synchronized.lock().insert(point);
            }
            None => debug!(label, "ignoring unknown synchronization label"),
        }
    }

    // ------------------------------------------------------------------
    // Observers used by the poll loops
    // ------------------------------------------------------------------

    #[inline]
    pub fn is_time_constrained(&self) -> bool {
        self.time_constrained.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_time_regulating(&self) -> bool {
        self.time_regulating.load(Ordering::Acquire)
    }

    pub fn is_synchronized(&self, point: SyncPoint) -> bool {
        self.synchronized.lock().contains(&point)
    }

    /// Consume the pending grant, if one arrived
    pub fn take_grant(&self) -> Option<LogicalTime> {
        self.granted.lock().take()
    }

    #[inline]
    pub fn is_pumping(&self) -> bool {
        self.pumping.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_advancing(&self) -> bool {
        self.advancing.load(Ordering::Acquire)
    }

    // ------------------------------------------------------------------
    // Liveness guards
    // ------------------------------------------------------------------

    /// Claim the pump; `None` if a pump is already running
    pub fn try_begin_pump(&self) -> Option<FlagGuard<'_>> {
        FlagGuard::acquire(&self.pumping)
    }

    /// Claim the advance slot; `None` if an advance is outstanding
    pub fn try_begin_advance(&self) -> Option<FlagGuard<'_>> {
        FlagGuard::acquire(&self.advancing)
    }
}

/// Clears its flag on drop
#[derive(Debug)]
pub struct FlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlagGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlagGuard { flag })
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_flags_start_cleared() {
        let callbacks = FederateCallbacks::new();
        assert!(!callbacks.is_time_constrained());
        assert!(!callbacks.is_time_regulating());
        assert!(callbacks.take_grant().is_none());
    }

    #[test]
    fn test_flags_visible_across_threads() {
        let callbacks = Arc::new(FederateCallbacks::new());
        let remote = Arc::clone(&callbacks);
        std::thread::spawn(move || {
            remote.on_time_constrained_enabled();
            remote.on_time_regulation_enabled();
        })
        .join()
        .unwrap();
        assert!(callbacks.is_time_constrained());
        assert!(callbacks.is_time_regulating());
    }

    #[test]
    fn test_grant_consumed_once() {
        let callbacks = FederateCallbacks::new();
        callbacks.on_time_advance_grant(LogicalTime::new(2.0));
        assert_eq!(callbacks.take_grant(), Some(LogicalTime::new(2.0)));
        assert_eq!(callbacks.take_grant(), None);
    }

    #[test]
    fn test_synchronized_labels() {
        let callbacks = FederateCallbacks::new();
        callbacks.on_federation_synchronized("readyToRun");
        callbacks.on_federation_synchronized("somethingElse");
        assert!(callbacks.is_synchronized(SyncPoint::ReadyToRun));
        assert!(!callbacks.is_synchronized(SyncPoint::ReadyToPopulate));
    }

    #[test]
    fn test_pump_guard_refuses_nesting() {
        let callbacks = FederateCallbacks::new();
        let outer = callbacks.try_begin_pump();
        assert!(outer.is_some());
        assert!(callbacks.is_pumping());
        assert!(callbacks.try_begin_pump().is_none());
        drop(outer);
        assert!(!callbacks.is_pumping());
        assert!(callbacks.try_begin_pump().is_some());
    }
}
