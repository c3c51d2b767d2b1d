//! Scripted Runtime Gateway
//!
//! An in-process stand-in for the federation runtime. Every response is
//! scripted up front; confirmations (policy enabled, time granted,
//! federation synchronized) are queued and delivered only when the federate
//! pumps callbacks, after a configurable number of pumps.

use std::collections::VecDeque;
use std::sync::Arc;

use fedra_core::{
    EnableStatus, FederateCallbacks, FederateHandle, FederateName, FederationName, GatewayError,
    GatewayResult, JoinReceipt, LogicalTime, LookaheadInterval, PollBudget, RuntimeGateway,
    SyncPoint,
};
use tracing::trace;

/// A call the federate made, in order
#[derive(Clone, Debug, PartialEq)]
pub enum GatewayCall {
    Connect,
    Join { federate: String, federation: String },
    Resign,
    EnableConstrained,
    EnableRegulating(LookaheadInterval),
    EnableAsynchronousDelivery,
    AdvanceRequest(LogicalTime),
    SyncAchieved(SyncPoint),
    Evoke,
}

/// Per-operation call counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GatewayCalls {
    pub connect: u32,
    pub join: u32,
    pub resign: u32,
    pub enable_constrained: u32,
    pub enable_regulating: u32,
    pub enable_asynchronous: u32,
    pub advance: u32,
    pub sync_achieved: u32,
    pub evoke: u64,
}

#[derive(Clone, Copy, Debug)]
enum Confirmation {
    Constrained,
    Regulating,
    Grant(LogicalTime),
    Synchronized(SyncPoint),
}

/// Scripted gateway
pub struct ScriptedGateway {
    callbacks: Option<Arc<FederateCallbacks>>,
    join_script: VecDeque<GatewayResult<JoinReceipt>>,
    constrained: GatewayResult<EnableStatus>,
    regulating: GatewayResult<EnableStatus>,
    asynchronous: GatewayResult<EnableStatus>,
    resign: GatewayResult<()>,
    /// Pumps a queued confirmation waits before it is delivered
    confirm_after: u64,
    /// Leading pumps that fail before any confirmation is delivered
    failing_pumps: u64,
    /// Grants are for this much less than requested when set
    grant_shortfall: Option<f64>,
    pending: Vec<(u64, Confirmation)>,
    calls: GatewayCalls,
    log: Vec<GatewayCall>,
    next_handle: u64,
}

impl Default for ScriptedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedGateway {
    /// Everything succeeds; confirmations arrive on the first pump
    pub fn new() -> Self {
        ScriptedGateway {
            callbacks: None,
            join_script: VecDeque::new(),
            constrained: Ok(EnableStatus::Accepted),
            regulating: Ok(EnableStatus::Accepted),
            asynchronous: Ok(EnableStatus::Accepted),
            resign: Ok(()),
            confirm_after: 1,
            failing_pumps: 0,
            grant_shortfall: None,
            pending: Vec::new(),
            calls: GatewayCalls::default(),
            log: Vec::new(),
            next_handle: 1,
        }
    }

    /// The first `n` joins fail because the federation does not exist yet
    pub fn federation_missing_for(mut self, n: u32) -> Self {
        for _ in 0..n {
            self.join_script.push_back(Err(GatewayError::FederationExecutionDoesNotExist(
                "federation not created".into(),
            )));
        }
        self
    }

    /// Queue one join response; once the script runs out joins succeed
    pub fn with_join_response(mut self, response: GatewayResult<JoinReceipt>) -> Self {
        self.join_script.push_back(response);
        self
    }

    pub fn with_constrained(mut self, response: GatewayResult<EnableStatus>) -> Self {
        self.constrained = response;
        self
    }

    pub fn with_regulating(mut self, response: GatewayResult<EnableStatus>) -> Self {
        self.regulating = response;
        self
    }

    pub fn with_asynchronous_delivery(mut self, response: GatewayResult<EnableStatus>) -> Self {
        self.asynchronous = response;
        self
    }

    pub fn with_resign(mut self, response: GatewayResult<()>) -> Self {
        self.resign = response;
        self
    }

    /// Deliver each confirmation after `pumps` pumps; zero delivers it
    /// synchronously from within the request
    pub fn confirm_after(mut self, pumps: u64) -> Self {
        self.confirm_after = pumps;
        self
    }

    /// The next `n` pumps report a runtime error
    pub fn failing_pumps(mut self, n: u64) -> Self {
        self.failing_pumps = n;
        self
    }

    /// Grant `shortfall` less than each requested time
    pub fn grant_short_by(mut self, shortfall: f64) -> Self {
        self.grant_shortfall = Some(shortfall);
        self
    }

    pub fn calls(&self) -> &GatewayCalls {
        &self.calls
    }

    pub fn log(&self) -> &[GatewayCall] {
        &self.log
    }

    pub fn is_connected(&self) -> bool {
        self.callbacks.is_some()
    }

    /// Confirmations queued but not yet delivered
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Lookahead handed over by the last regulation request
    pub fn last_lookahead(&self) -> Option<LookaheadInterval> {
        self.log.iter().rev().find_map(|call| match call {
            GatewayCall::EnableRegulating(lookahead) => Some(*lookahead),
            _ => None,
        })
    }

    /// Synchronization points achieved, in the order reported
    pub fn sync_points(&self) -> Vec<SyncPoint> {
        self.log
            .iter()
            .filter_map(|call| match call {
                GatewayCall::SyncAchieved(point) => Some(*point),
                _ => None,
            })
            .collect()
    }

    fn schedule(&mut self, confirmation: Confirmation) -> GatewayResult<()> {
        if self.confirm_after == 0 {
            return self.deliver(confirmation);
        }
        self.pending.push((self.confirm_after, confirmation));
        Ok(())
    }

    fn deliver(&self, confirmation: Confirmation) -> GatewayResult<()> {
        let callbacks = self.callbacks.as_ref().ok_or(GatewayError::NotConnected)?;
        trace!(?confirmation, "delivering callback");
        match confirmation {
            Confirmation::Constrained => callbacks.on_time_constrained_enabled(),
            Confirmation::Regulating => callbacks.on_time_regulation_enabled(),
            Confirmation::Grant(t) => callbacks.on_time_advance_grant(t),
            Confirmation::Synchronized(point) => callbacks.on_federation_synchronized(point.label()),
        }
        Ok(())
    }

    fn enable(
        &mut self,
        response: GatewayResult<EnableStatus>,
        confirmation: Option<Confirmation>,
    ) -> GatewayResult<EnableStatus> {
        let status = response?;
        if let (EnableStatus::Accepted, Some(confirmation)) = (status, confirmation) {
            self.schedule(confirmation)?;
        }
        Ok(status)
    }
}

impl RuntimeGateway for ScriptedGateway {
    fn connect(&mut self, callbacks: Arc<FederateCallbacks>) -> GatewayResult<()> {
        self.calls.connect += 1;
        self.log.push(GatewayCall::Connect);
        self.callbacks = Some(callbacks);
        Ok(())
    }

    fn join_federation_execution(
        &mut self,
        federate: &FederateName,
        federation: &FederationName,
    ) -> GatewayResult<JoinReceipt> {
        self.calls.join += 1;
        self.log.push(GatewayCall::Join {
            federate: federate.as_str().to_string(),
            federation: federation.as_str().to_string(),
        });
        if let Some(response) = self.join_script.pop_front() {
            return response;
        }
        let handle = FederateHandle::new(self.next_handle);
        self.next_handle += 1;
        Ok(JoinReceipt { handle })
    }

    fn resign_federation_execution(&mut self) -> GatewayResult<()> {
        self.calls.resign += 1;
        self.log.push(GatewayCall::Resign);
        self.resign.clone()
    }

    fn enable_time_constrained(&mut self) -> GatewayResult<EnableStatus> {
        self.calls.enable_constrained += 1;
        self.log.push(GatewayCall::EnableConstrained);
        self.enable(self.constrained.clone(), Some(Confirmation::Constrained))
    }

    fn enable_time_regulation(&mut self, lookahead: LookaheadInterval) -> GatewayResult<EnableStatus> {
        self.calls.enable_regulating += 1;
        self.log.push(GatewayCall::EnableRegulating(lookahead));
        self.enable(self.regulating.clone(), Some(Confirmation::Regulating))
    }

    fn enable_asynchronous_delivery(&mut self) -> GatewayResult<EnableStatus> {
        self.calls.enable_asynchronous += 1;
        self.log.push(GatewayCall::EnableAsynchronousDelivery);
        self.enable(self.asynchronous.clone(), None)
    }

    fn time_advance_request(&mut self, target: LogicalTime) -> GatewayResult<()> {
        self.calls.advance += 1;
        self.log.push(GatewayCall::AdvanceRequest(target));
        let granted = match self.grant_shortfall {
            Some(shortfall) => LogicalTime::new(target.as_f64() - shortfall),
            None => target,
        };
        self.schedule(Confirmation::Grant(granted))
    }

    fn synchronization_point_achieved(&mut self, point: SyncPoint) -> GatewayResult<()> {
        self.calls.sync_achieved += 1;
        self.log.push(GatewayCall::SyncAchieved(point));
        self.schedule(Confirmation::Synchronized(point))
    }

    fn evoke_callbacks(&mut self, _budget: PollBudget) -> GatewayResult<()> {
        self.calls.evoke += 1;
        self.log.push(GatewayCall::Evoke);
        if self.callbacks.is_none() {
            return Err(GatewayError::NotConnected);
        }
        if self.failing_pumps > 0 {
            self.failing_pumps -= 1;
            return Err(GatewayError::Internal("callback dispatch failed".into()));
        }

        let mut due = Vec::new();
        self.pending.retain_mut(|(remaining, confirmation)| {
            *remaining -= 1;
            if *remaining == 0 {
                due.push(*confirmation);
                false
            } else {
                true
            }
        });
        for confirmation in due {
            self.deliver(confirmation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedra_time::TimeCoordinator;

    fn connected(gateway: ScriptedGateway) -> (ScriptedGateway, Arc<FederateCallbacks>) {
        let mut gateway = gateway;
        let callbacks = Arc::new(FederateCallbacks::new());
        gateway.connect(Arc::clone(&callbacks)).unwrap();
        (gateway, callbacks)
    }

    #[test]
    fn test_join_script_then_success() {
        let mut gw = ScriptedGateway::new().federation_missing_for(2);
        let federate = FederateName::new("Sim-A").unwrap();
        let federation = FederationName::new("Ex-1").unwrap();

        assert!(gw.join_federation_execution(&federate, &federation).is_err());
        assert!(gw.join_federation_execution(&federate, &federation).is_err());
        let receipt = gw.join_federation_execution(&federate, &federation).unwrap();
        assert_eq!(receipt.handle, FederateHandle::new(1));
        assert_eq!(gw.calls().join, 3);
    }

    #[test]
    fn test_confirmation_waits_for_pumps() {
        let (mut gw, callbacks) = connected(ScriptedGateway::new().confirm_after(3));
        let budget = PollBudget::default();

        assert_eq!(gw.enable_time_regulation(LookaheadInterval::new(0.5)), Ok(EnableStatus::Accepted));
        gw.evoke_callbacks(budget).unwrap();
        gw.evoke_callbacks(budget).unwrap();
        assert!(!callbacks.is_time_regulating());
        gw.evoke_callbacks(budget).unwrap();
        assert!(callbacks.is_time_regulating());
        assert_eq!(gw.pending(), 0);
        assert_eq!(gw.last_lookahead(), Some(LookaheadInterval::new(0.5)));
    }

    #[test]
    fn test_zero_pumps_delivers_synchronously() {
        let (mut gw, callbacks) = connected(ScriptedGateway::new().confirm_after(0));
        gw.enable_time_constrained().unwrap();
        assert!(callbacks.is_time_constrained());
        assert_eq!(gw.calls().evoke, 0);
    }

    #[test]
    fn test_already_enabled_queues_nothing() {
        let (mut gw, callbacks) = connected(
            ScriptedGateway::new().with_constrained(Ok(EnableStatus::AlreadyEnabled)),
        );
        assert_eq!(gw.enable_time_constrained(), Ok(EnableStatus::AlreadyEnabled));
        assert_eq!(gw.pending(), 0);

        // The coordinator records the policy without waiting for a callback
        let mut tc = TimeCoordinator::new(callbacks);
        assert_eq!(tc.enable_constrained(&mut gw).unwrap(), EnableStatus::AlreadyEnabled);
        assert!(tc.is_time_constrained());
        assert_eq!(gw.calls().evoke, 0);
    }

    #[test]
    fn test_failing_pumps() {
        let (mut gw, callbacks) = connected(ScriptedGateway::new().failing_pumps(1));
        gw.synchronization_point_achieved(SyncPoint::ReadyToPopulate).unwrap();

        assert!(gw.evoke_callbacks(PollBudget::default()).is_err());
        assert!(!callbacks.is_synchronized(SyncPoint::ReadyToPopulate));
        gw.evoke_callbacks(PollBudget::default()).unwrap();
        assert!(callbacks.is_synchronized(SyncPoint::ReadyToPopulate));
    }

    #[test]
    fn test_pump_before_connect() {
        let mut gw = ScriptedGateway::new();
        assert_eq!(
            gw.evoke_callbacks(PollBudget::default()),
            Err(GatewayError::NotConnected)
        );
    }
}
