//! Time Coordinator - enable-and-poll time management

use std::sync::Arc;

use fedra_core::{
    ContractViolation, EnableStatus, FederateCallbacks, FederateError, FederateResult,
    LogicalTime, PollBudget, RuntimeGateway, SyncPoint, TimeOperation, TimeParameters,
};
use tracing::{debug, error, info, warn};

/// Time Coordinator configuration
#[derive(Clone, Debug, PartialEq)]
pub struct CoordinatorConfig {
    /// Step size and lookahead
    pub params: TimeParameters,
    /// Wall-clock budget per callback pump
    pub budget: PollBudget,
    /// Give up a wait after this many polls; `None` waits forever
    pub poll_limit: Option<u64>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            params: TimeParameters::default(),
            budget: PollBudget::default(),
            poll_limit: None,
        }
    }
}

/// Outcome of a single pump
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    /// Callbacks were pumped
    Pumped,
    /// The runtime reported an error; logged and ignored
    Failed,
    /// Another pump was already running
    Refused,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Pumps that reached the gateway
    pub polls: u64,
    /// Pumps the gateway reported an error for
    pub failed: u64,
    /// Pumps refused by the liveness guard
    pub refused: u64,
}

/// Time Coordinator - owns logical time and drives the callback pump
pub struct TimeCoordinator {
    /// State the runtime reports into
    callbacks: Arc<FederateCallbacks>,
    /// Last granted logical time
    logical_time: LogicalTime,
    /// Configuration
    config: CoordinatorConfig,
    stats: PollStats,
}

impl TimeCoordinator {
    /// Create a coordinator with default configuration
    pub fn new(callbacks: Arc<FederateCallbacks>) -> Self {
        Self::with_config(callbacks, CoordinatorConfig::default())
    }

    pub fn with_config(callbacks: Arc<FederateCallbacks>, config: CoordinatorConfig) -> Self {
        TimeCoordinator {
            callbacks,
            logical_time: LogicalTime::ZERO,
            config,
            stats: PollStats::default(),
        }
    }

    pub fn callbacks(&self) -> &Arc<FederateCallbacks> {
        &self.callbacks
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn logical_time(&self) -> LogicalTime {
        self.logical_time
    }

    pub fn step_size(&self) -> f64 {
        self.config.params.step_size
    }

    pub fn lookahead(&self) -> f64 {
        self.config.params.lookahead
    }

    pub fn is_time_constrained(&self) -> bool {
        self.callbacks.is_time_constrained()
    }

    pub fn is_time_regulating(&self) -> bool {
        self.callbacks.is_time_regulating()
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }

    /// Enable time constrained, blocking until the runtime confirms
    ///
    /// "Already enabled" counts as success: the flag is set directly and the
    /// poll loop is skipped.
    pub fn enable_constrained<G>(&mut self, gateway: &mut G) -> FederateResult<EnableStatus>
    where
        G: RuntimeGateway + ?Sized,
    {
        let operation = TimeOperation::EnableConstrained;
        info!("enabling time constrained");
        match gateway.enable_time_constrained() {
            Ok(EnableStatus::AlreadyEnabled) => {
                info!("time constrained already enabled");
                self.callbacks.on_time_constrained_enabled();
                Ok(EnableStatus::AlreadyEnabled)
            }
            Ok(EnableStatus::Accepted) => {
                self.poll_until(gateway, operation, |cb| cb.is_time_constrained().then_some(()))?;
                info!(time = %self.logical_time, "time constrained");
                Ok(EnableStatus::Accepted)
            }
            Err(source) => Err(FederateError::TimeManagement { operation, source }),
        }
    }

    /// Enable time regulation with the configured lookahead, blocking until
    /// the runtime confirms
    pub fn enable_regulating<G>(&mut self, gateway: &mut G) -> FederateResult<EnableStatus>
    where
        G: RuntimeGateway + ?Sized,
    {
        let operation = TimeOperation::EnableRegulating;
        let lookahead = self.config.params.lookahead_interval();
        info!(lookahead = lookahead.as_f64(), "enabling time regulation");
        match gateway.enable_time_regulation(lookahead) {
            Ok(EnableStatus::AlreadyEnabled) => {
                info!("time regulation already enabled");
                self.callbacks.on_time_regulation_enabled();
                Ok(EnableStatus::AlreadyEnabled)
            }
            Ok(EnableStatus::Accepted) => {
                self.poll_until(gateway, operation, |cb| cb.is_time_regulating().then_some(()))?;
                info!(time = %self.logical_time, "time regulating");
                Ok(EnableStatus::Accepted)
            }
            Err(source) => Err(FederateError::TimeManagement { operation, source }),
        }
    }

    /// Enable delivery of receive-order messages outside time-advance grants
    pub fn enable_asynchronous_delivery<G>(&mut self, gateway: &mut G) -> FederateResult<EnableStatus>
    where
        G: RuntimeGateway + ?Sized,
    {
        info!("enabling asynchronous delivery of receive order messages");
        gateway
            .enable_asynchronous_delivery()
            .map_err(|source| FederateError::TimeManagement {
                operation: TimeOperation::EnableAsynchronousDelivery,
                source,
            })
    }

    /// Pump pending callbacks once within the configured budget
    ///
    /// This is the only place the coordinator hands control to the runtime.
    /// Runtime errors are logged and swallowed so the caller's loop polls again.
    pub fn poll_once<G>(&mut self, gateway: &mut G) -> PollOutcome
    where
        G: RuntimeGateway + ?Sized,
    {
        let callbacks = Arc::clone(&self.callbacks);
        let Some(_pump) = callbacks.try_begin_pump() else {
            warn!("callback pump already running, refusing nested poll");
            self.stats.refused += 1;
            return PollOutcome::Refused;
        };

        self.stats.polls += 1;
        match gateway.evoke_callbacks(self.config.budget) {
            Ok(()) => PollOutcome::Pumped,
            Err(e) => {
                error!(error = %e, "callback pump failed");
                self.stats.failed += 1;
                PollOutcome::Failed
            }
        }
    }

    /// Request an advance of one step and block until it is granted
    ///
    /// Returns the new logical time.
    pub fn advance_time<G>(&mut self, gateway: &mut G) -> FederateResult<LogicalTime>
    where
        G: RuntimeGateway + ?Sized,
    {
        let operation = TimeOperation::AdvanceTime;
        let callbacks = Arc::clone(&self.callbacks);
        let _advancing = callbacks
            .try_begin_advance()
            .ok_or(ContractViolation::AdvanceInProgress)?;

        let target = self.logical_time + self.config.params.step_size;
        debug!(from = %self.logical_time, %target, "requesting time advance");

        // A grant left over from an earlier request must not satisfy this one
        callbacks.take_grant();
        gateway
            .time_advance_request(target)
            .map_err(|source| FederateError::TimeManagement { operation, source })?;

        let granted = self.poll_until(gateway, operation, |cb| cb.take_grant())?;
        self.record_logical_time(granted)?;
        Ok(self.logical_time)
    }

    /// Record a granted time
    /// INVARIANT: logical time is finite and never moves backwards
    pub fn record_logical_time(&mut self, granted: LogicalTime) -> FederateResult<()> {
        if !(granted.as_f64().is_finite() && granted >= self.logical_time) {
            return Err(FederateError::NonMonotonicGrant {
                granted,
                current: self.logical_time,
            });
        }
        self.logical_time = granted;
        Ok(())
    }

    /// Report `point` as achieved and block until the federation synchronizes
    pub fn synchronize<G>(&mut self, gateway: &mut G, point: SyncPoint) -> FederateResult<()>
    where
        G: RuntimeGateway + ?Sized,
    {
        info!(%point, "achieving synchronization point");
        gateway
            .synchronization_point_achieved(point)
            .map_err(FederateError::Gateway)?;
        self.poll_until(gateway, TimeOperation::Synchronize(point), |cb| {
            cb.is_synchronized(point).then_some(())
        })?;
        info!(%point, "federation synchronized");
        Ok(())
    }

    /// Poll until `ready` yields a value
    ///
    /// The condition is checked before every pump, so a confirmation that
    /// arrived synchronously costs no polls and one that needs `k` pumps
    /// costs exactly `k`. Refused pumps count towards the poll limit.
    fn poll_until<G, T, F>(
        &mut self,
        gateway: &mut G,
        operation: TimeOperation,
        mut ready: F,
    ) -> FederateResult<T>
    where
        G: RuntimeGateway + ?Sized,
        F: FnMut(&FederateCallbacks) -> Option<T>,
    {
        let callbacks = Arc::clone(&self.callbacks);
        let mut polls = 0u64;
        loop {
            if let Some(value) = ready(&callbacks) {
                debug!(%operation, polls, "confirmed");
                return Ok(value);
            }
            if let Some(limit) = self.config.poll_limit {
                if polls >= limit {
                    warn!(%operation, polls, "poll limit reached");
                    return Err(FederateError::PollLimitExceeded { operation, polls });
                }
            }
            if self.poll_once(gateway) == PollOutcome::Refused {
                // Another pump holds the guard; let it finish
                std::thread::yield_now();
            }
            polls += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedra_core::{
        FederateName, FederationName, GatewayError, GatewayResult, JoinReceipt, LookaheadInterval,
    };
    use proptest::prelude::*;

    /// Confirms each request after a fixed number of pumps
    #[derive(Default)]
    struct CountingGateway {
        callbacks: Option<Arc<FederateCallbacks>>,
        constrained: Option<GatewayResult<EnableStatus>>,
        regulating: Option<GatewayResult<EnableStatus>>,
        pumps_needed: u64,
        pending: Option<(u64, Pending)>,
        evoke_calls: u64,
        evoke_error: Option<GatewayError>,
        lookahead_seen: Option<LookaheadInterval>,
    }

    #[derive(Clone, Copy)]
    enum Pending {
        Constrained,
        Regulating,
        Grant(LogicalTime),
        Synchronized(SyncPoint),
    }

    impl CountingGateway {
        fn new(callbacks: &Arc<FederateCallbacks>, pumps_needed: u64) -> Self {
            CountingGateway {
                callbacks: Some(Arc::clone(callbacks)),
                pumps_needed,
                ..Default::default()
            }
        }

        fn schedule(&mut self, pending: Pending) {
            self.pending = Some((self.pumps_needed, pending));
        }
    }

    impl RuntimeGateway for CountingGateway {
        fn connect(&mut self, callbacks: Arc<FederateCallbacks>) -> GatewayResult<()> {
            self.callbacks = Some(callbacks);
            Ok(())
        }

        fn join_federation_execution(
            &mut self,
            _federate: &FederateName,
            _federation: &FederationName,
        ) -> GatewayResult<JoinReceipt> {
            Err(GatewayError::Rejected("not under test".into()))
        }

        fn resign_federation_execution(&mut self) -> GatewayResult<()> {
            Ok(())
        }

        fn enable_time_constrained(&mut self) -> GatewayResult<EnableStatus> {
            let result = self.constrained.clone().unwrap_or(Ok(EnableStatus::Accepted));
            if result == Ok(EnableStatus::Accepted) {
                self.schedule(Pending::Constrained);
            }
            result
        }

        fn enable_time_regulation(
            &mut self,
            lookahead: LookaheadInterval,
        ) -> GatewayResult<EnableStatus> {
            self.lookahead_seen = Some(lookahead);
            let result = self.regulating.clone().unwrap_or(Ok(EnableStatus::Accepted));
            if result == Ok(EnableStatus::Accepted) {
                self.schedule(Pending::Regulating);
            }
            result
        }

        fn enable_asynchronous_delivery(&mut self) -> GatewayResult<EnableStatus> {
            Ok(EnableStatus::AlreadyEnabled)
        }

        fn time_advance_request(&mut self, target: LogicalTime) -> GatewayResult<()> {
            self.schedule(Pending::Grant(target));
            Ok(())
        }

        fn synchronization_point_achieved(&mut self, point: SyncPoint) -> GatewayResult<()> {
            self.schedule(Pending::Synchronized(point));
            Ok(())
        }

        fn evoke_callbacks(&mut self, _budget: PollBudget) -> GatewayResult<()> {
            self.evoke_calls += 1;
            if let Some(e) = self.evoke_error.take() {
                return Err(e);
            }
            let Some((remaining, pending)) = self.pending.take() else {
                return Ok(());
            };
            if remaining > 1 {
                self.pending = Some((remaining - 1, pending));
                return Ok(());
            }
            let cb = self.callbacks.as_ref().unwrap();
            match pending {
                Pending::Constrained => cb.on_time_constrained_enabled(),
                Pending::Regulating => cb.on_time_regulation_enabled(),
                Pending::Grant(t) => cb.on_time_advance_grant(t),
                Pending::Synchronized(p) => cb.on_federation_synchronized(p.label()),
            }
            Ok(())
        }
    }

    fn coordinator(config: CoordinatorConfig) -> (TimeCoordinator, Arc<FederateCallbacks>) {
        let callbacks = Arc::new(FederateCallbacks::new());
        (
            TimeCoordinator::with_config(Arc::clone(&callbacks), config),
            callbacks,
        )
    }

    #[test]
    fn test_already_enabled_skips_poll_loop() {
        let (mut tc, callbacks) = coordinator(CoordinatorConfig::default());
        let mut gw = CountingGateway::new(&callbacks, 3);
        gw.constrained = Some(Ok(EnableStatus::AlreadyEnabled));

        let status = tc.enable_constrained(&mut gw).unwrap();
        assert_eq!(status, EnableStatus::AlreadyEnabled);
        assert_eq!(gw.evoke_calls, 0);
        assert_eq!(tc.stats().polls, 0);
        assert!(tc.is_time_constrained());
    }

    #[test]
    fn test_already_regulating_sets_flag() {
        let (mut tc, callbacks) = coordinator(CoordinatorConfig::default());
        let mut gw = CountingGateway::new(&callbacks, 3);
        gw.regulating = Some(Ok(EnableStatus::AlreadyEnabled));

        assert_eq!(tc.enable_regulating(&mut gw).unwrap(), EnableStatus::AlreadyEnabled);
        assert!(tc.is_time_regulating());
        assert!(callbacks.is_time_regulating());
        assert_eq!(gw.evoke_calls, 0);
    }

    #[test]
    fn test_accepted_polls_exactly_k_times() {
        for k in 1..=5 {
            let (mut tc, callbacks) = coordinator(CoordinatorConfig::default());
            let mut gw = CountingGateway::new(&callbacks, k);

            tc.enable_constrained(&mut gw).unwrap();
            assert!(tc.is_time_constrained());
            assert_eq!(gw.evoke_calls, k);
            assert_eq!(tc.stats().polls, k);
        }
    }

    #[test]
    fn test_regulating_passes_lookahead() {
        let config = CoordinatorConfig {
            params: TimeParameters::new(1.0, 0.5).unwrap(),
            ..Default::default()
        };
        let (mut tc, callbacks) = coordinator(config);
        let mut gw = CountingGateway::new(&callbacks, 3);

        assert_eq!(tc.enable_regulating(&mut gw).unwrap(), EnableStatus::Accepted);
        assert_eq!(gw.lookahead_seen, Some(LookaheadInterval::new(0.5)));
        assert_eq!(gw.evoke_calls, 3);
        assert!(tc.is_time_regulating());
    }

    #[test]
    fn test_enable_failure_wraps_cause() {
        let (mut tc, callbacks) = coordinator(CoordinatorConfig::default());
        let mut gw = CountingGateway::new(&callbacks, 1);
        gw.regulating = Some(Err(GatewayError::InvalidLookahead(0.0)));

        let err = tc.enable_regulating(&mut gw).unwrap_err();
        assert!(matches!(
            err,
            FederateError::TimeManagement {
                operation: TimeOperation::EnableRegulating,
                source: GatewayError::InvalidLookahead(_),
            }
        ));
        assert_eq!(gw.evoke_calls, 0);
    }

    #[test]
    fn test_pump_error_is_swallowed() {
        let (mut tc, callbacks) = coordinator(CoordinatorConfig::default());
        let mut gw = CountingGateway::new(&callbacks, 2);
        gw.evoke_error = Some(GatewayError::CallNotAllowedFromWithinCallback);

        // The failed pump does not count down the pending confirmation
        tc.enable_constrained(&mut gw).unwrap();
        assert_eq!(gw.evoke_calls, 3);
        assert_eq!(tc.stats().failed, 1);
    }

    #[test]
    fn test_nested_pump_refused() {
        let (mut tc, callbacks) = coordinator(CoordinatorConfig::default());
        let mut gw = CountingGateway::new(&callbacks, 1);

        let _held = callbacks.try_begin_pump().unwrap();
        assert_eq!(tc.poll_once(&mut gw), PollOutcome::Refused);
        assert_eq!(gw.evoke_calls, 0);
        assert_eq!(tc.stats().refused, 1);
    }

    #[test]
    fn test_refused_pumps_count_towards_limit() {
        let config = CoordinatorConfig {
            poll_limit: Some(3),
            ..Default::default()
        };
        let (mut tc, callbacks) = coordinator(config);
        let mut gw = CountingGateway::new(&callbacks, 1);

        let _held = callbacks.try_begin_pump().unwrap();
        let err = tc.enable_constrained(&mut gw).unwrap_err();
        assert!(matches!(
            err,
            FederateError::PollLimitExceeded {
                operation: TimeOperation::EnableConstrained,
                polls: 3,
            }
        ));
        assert_eq!(tc.stats().refused, 3);
        assert_eq!(gw.evoke_calls, 0);
    }

    #[test]
    fn test_poll_limit() {
        let config = CoordinatorConfig {
            poll_limit: Some(4),
            ..Default::default()
        };
        let (mut tc, callbacks) = coordinator(config);
        let mut gw = CountingGateway::new(&callbacks, 10);

        let err = tc.enable_constrained(&mut gw).unwrap_err();
        assert!(matches!(
            err,
            FederateError::PollLimitExceeded {
                operation: TimeOperation::EnableConstrained,
                polls: 4,
            }
        ));
        assert_eq!(gw.evoke_calls, 4);
    }

    #[test]
    fn test_advance_time_records_grant() {
        let config = CoordinatorConfig {
            params: TimeParameters::new(2.5, 0.5).unwrap(),
            ..Default::default()
        };
        let (mut tc, callbacks) = coordinator(config);
        let mut gw = CountingGateway::new(&callbacks, 2);

        assert_eq!(tc.advance_time(&mut gw).unwrap(), LogicalTime::new(2.5));
        assert_eq!(tc.advance_time(&mut gw).unwrap(), LogicalTime::new(5.0));
        assert_eq!(gw.evoke_calls, 4);
        assert!(!callbacks.is_advancing());
    }

    #[test]
    fn test_advance_while_advancing_is_violation() {
        let (mut tc, callbacks) = coordinator(CoordinatorConfig::default());
        let mut gw = CountingGateway::new(&callbacks, 1);

        let _held = callbacks.try_begin_advance().unwrap();
        let err = tc.advance_time(&mut gw).unwrap_err();
        assert!(matches!(
            err,
            FederateError::ContractViolation(ContractViolation::AdvanceInProgress)
        ));
    }

    #[test]
    fn test_synchronize_waits_for_federation() {
        let (mut tc, callbacks) = coordinator(CoordinatorConfig::default());
        let mut gw = CountingGateway::new(&callbacks, 2);

        tc.synchronize(&mut gw, SyncPoint::ReadyToPopulate).unwrap();
        assert!(callbacks.is_synchronized(SyncPoint::ReadyToPopulate));
        assert_eq!(gw.evoke_calls, 2);
    }

    #[test]
    fn test_backwards_grant_rejected() {
        let (mut tc, _) = coordinator(CoordinatorConfig::default());
        tc.record_logical_time(LogicalTime::new(3.0)).unwrap();
        let err = tc.record_logical_time(LogicalTime::new(1.0)).unwrap_err();
        assert!(matches!(err, FederateError::NonMonotonicGrant { .. }));
        assert_eq!(tc.logical_time(), LogicalTime::new(3.0));
    }

    #[test]
    fn test_non_finite_grant_rejected() {
        let (mut tc, _) = coordinator(CoordinatorConfig::default());
        tc.record_logical_time(LogicalTime::new(5.0)).unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = tc.record_logical_time(LogicalTime::new(bad)).unwrap_err();
            assert!(matches!(err, FederateError::NonMonotonicGrant { .. }));
        }
        assert_eq!(tc.logical_time(), LogicalTime::new(5.0));

        // Time is still guarded after the rejected grants
        assert!(tc.record_logical_time(LogicalTime::new(1.0)).is_err());
        tc.record_logical_time(LogicalTime::new(5.0)).unwrap();
        assert_eq!(tc.logical_time(), LogicalTime::new(5.0));
    }

    proptest! {
        #[test]
        fn prop_logical_time_never_decreases(
            grants in prop::collection::vec(
                prop_oneof![9 => 0.0f64..1000.0, 1 => Just(f64::NAN), 1 => Just(f64::INFINITY)],
                1..32,
            )
        ) {
            let (mut tc, _) = coordinator(CoordinatorConfig::default());
            let mut previous = tc.logical_time();
            for g in grants {
                let _ = tc.record_logical_time(LogicalTime::new(g));
                prop_assert!(tc.logical_time().as_f64().is_finite());
                prop_assert!(tc.logical_time() >= previous);
                previous = tc.logical_time();
            }
        }
    }
}
