//! Runtime gateway - the federate's view of the federation bus
//!
//! The runtime delivers every state-changing confirmation through callbacks,
//! and only dispatches those callbacks when the federate pumps them with
//! [`RuntimeGateway::evoke_callbacks`]. Requests therefore come in two halves:
//! the synchronous call here, and a later callback into [`FederateCallbacks`].

use std::sync::Arc;

use crate::{
    FederateCallbacks, FederateHandle, FederateName, FederationName, GatewayResult,
    LogicalTime, LookaheadInterval, PollBudget, SyncPoint,
};

/// Successful join
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinReceipt {
    pub handle: FederateHandle,
}

/// Outcome of a policy-enable request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnableStatus {
    /// Request accepted; confirmation arrives as a callback
    Accepted,
    /// The policy was already in force
    AlreadyEnabled,
}

/// Operations the federate core consumes from the runtime
///
/// The gateway is owned by a single federate and driven from one thread.
/// Implementations may deliver callbacks from their own threads; the
/// callback state they were handed in [`connect`](Self::connect) is safe to
/// share.
pub trait RuntimeGateway {
    /// Attach the callback state the runtime will report into
    fn connect(&mut self, callbacks: Arc<FederateCallbacks>) -> GatewayResult<()>;

    fn join_federation_execution(
        &mut self,
        federate: &FederateName,
        federation: &FederationName,
    ) -> GatewayResult<JoinReceipt>;

    fn resign_federation_execution(&mut self) -> GatewayResult<()>;

    fn enable_time_constrained(&mut self) -> GatewayResult<EnableStatus>;

    fn enable_time_regulation(&mut self, lookahead: LookaheadInterval)
        -> GatewayResult<EnableStatus>;

    /// Deliver receive-order messages outside of time-advance grants
    fn enable_asynchronous_delivery(&mut self) -> GatewayResult<EnableStatus>;

    /// Ask to advance to `target`; the grant arrives as a callback
    fn time_advance_request(&mut self, target: LogicalTime) -> GatewayResult<()>;

    /// Report that this federate reached `point`; the federation-synchronized
    /// notice arrives as a callback once every federate has
    fn synchronization_point_achieved(&mut self, point: SyncPoint) -> GatewayResult<()>;

    /// Pump pending callbacks within the wall-clock budget
    fn evoke_callbacks(&mut self, budget: PollBudget) -> GatewayResult<()>;
}

impl<G: RuntimeGateway + ?Sized> RuntimeGateway for Box<G> {
    fn connect(&mut self, callbacks: Arc<FederateCallbacks>) -> GatewayResult<()> {
        (**self).connect(callbacks)
    }

    fn join_federation_execution(
        &mut self,
        federate: &FederateName,
        federation: &FederationName,
    ) -> GatewayResult<JoinReceipt> {
        (**self).join_federation_execution(federate, federation)
    }

    fn resign_federation_execution(&mut self) -> GatewayResult<()> {
        (**self).resign_federation_execution()
    }

    fn enable_time_constrained(&mut self) -> GatewayResult<EnableStatus> {
        (**self).enable_time_constrained()
    }

    fn enable_time_regulation(
        &mut self,
        lookahead: LookaheadInterval,
    ) -> GatewayResult<EnableStatus> {
        (**self).enable_time_regulation(lookahead)
    }

    fn enable_asynchronous_delivery(&mut self) -> GatewayResult<EnableStatus> {
        (**self).enable_asynchronous_delivery()
    }

    fn time_advance_request(&mut self, target: LogicalTime) -> GatewayResult<()> {
        (**self).time_advance_request(target)
    }

    fn synchronization_point_achieved(&mut self, point: SyncPoint) -> GatewayResult<()> {
        (**self).synchronization_point_achieved(point)
    }

    fn evoke_callbacks(&mut self, budget: PollBudget) -> GatewayResult<()> {
        (**self).evoke_callbacks(budget)
    }
}
