//! Federate Lifecycle - the federate's state machine and driver

use std::sync::Arc;

use fedra_core::{
    ClassHierarchyIndex, ContractViolation, EnableStatus, FederateCallbacks, FederateError,
    FederateHandle, FederateIdentity, FederateResult, HookError, InteractionClass, InterestSet,
    LifecycleState, LogicalTime, RuntimeGateway, SyncPoint, SyncPointTracker,
};
use fedra_time::{PollOutcome, TimeCoordinator};
use tracing::{error, info, warn};

use crate::{FederateConfig, JoinSupervisor, Sleeper, ThreadSleeper};

/// Application code run at the synchronization points
///
/// `ready_to_populate` typically registers and publishes initial objects;
/// `ready_to_run` runs the simulation loop and returns when the federate is
/// ready to resign.
pub trait FederateHooks<G: RuntimeGateway> {
    fn ready_to_populate(&mut self, ctx: &mut FederateContext<'_, G>) -> Result<(), HookError>;

    fn ready_to_run(&mut self, ctx: &mut FederateContext<'_, G>) -> Result<(), HookError>;
}

/// What a hook may touch while it runs
pub struct FederateContext<'a, G: RuntimeGateway> {
    identity: &'a FederateIdentity,
    handle: Option<FederateHandle>,
    gateway: &'a mut G,
    time: &'a mut TimeCoordinator,
    object_model: Option<&'a InteractionClass>,
}

impl<'a, G: RuntimeGateway> FederateContext<'a, G> {
    pub fn identity(&self) -> &FederateIdentity {
        self.identity
    }

    pub fn handle(&self) -> Option<FederateHandle> {
        self.handle
    }

    pub fn gateway(&mut self) -> &mut G {
        self.gateway
    }

    pub fn logical_time(&self) -> LogicalTime {
        self.time.logical_time()
    }

    pub fn step_size(&self) -> f64 {
        self.time.step_size()
    }

    /// Advance logical time by one step, blocking until granted
    pub fn advance_time(&mut self) -> FederateResult<LogicalTime> {
        self.time.advance_time(&mut *self.gateway)
    }

    /// Pump pending callbacks once
    pub fn poll_once(&mut self) -> PollOutcome {
        self.time.poll_once(&mut *self.gateway)
    }

    pub fn class_index(&self) -> Option<ClassHierarchyIndex<'a>> {
        self.object_model.map(ClassHierarchyIndex::new)
    }
}

/// Federate Lifecycle - owns the gateway and sequences every phase
pub struct FederateLifecycle<G: RuntimeGateway, S: Sleeper = ThreadSleeper> {
    identity: FederateIdentity,
    config: FederateConfig,
    gateway: G,
    time: TimeCoordinator,
    join: JoinSupervisor<S>,
    state: LifecycleState,
    sync: SyncPointTracker,
    handle: Option<FederateHandle>,
    object_model: Option<InteractionClass>,
}

impl<G: RuntimeGateway> FederateLifecycle<G> {
    /// Create a federate that sleeps the current thread between join attempts
    pub fn new(gateway: G, config: FederateConfig) -> FederateResult<Self> {
        Self::with_sleeper(gateway, config, ThreadSleeper)
    }
}

impl<G: RuntimeGateway, S: Sleeper> FederateLifecycle<G, S> {
    pub fn with_sleeper(gateway: G, config: FederateConfig, sleeper: S) -> FederateResult<Self> {
        config.validate()?;
        let identity = config.identity()?;
        let callbacks = Arc::new(FederateCallbacks::new());
        Ok(FederateLifecycle {
            identity,
            time: TimeCoordinator::with_config(callbacks, config.coordinator_config()),
            join: JoinSupervisor::with_sleeper(config.join, sleeper),
            config,
            gateway,
            state: LifecycleState::Constructed,
            sync: SyncPointTracker::new(),
            handle: None,
            object_model: None,
        })
    }

    /// Attach the interaction-class tree used for publish/subscribe sets
    pub fn with_object_model(mut self, root: InteractionClass) -> Self {
        self.object_model = Some(root);
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn identity(&self) -> &FederateIdentity {
        &self.identity
    }

    pub fn config(&self) -> &FederateConfig {
        &self.config
    }

    pub fn handle(&self) -> Option<FederateHandle> {
        self.handle
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    pub fn time(&self) -> &TimeCoordinator {
        &self.time
    }

    pub fn callbacks(&self) -> &Arc<FederateCallbacks> {
        self.time.callbacks()
    }

    pub fn logical_time(&self) -> LogicalTime {
        self.time.logical_time()
    }

    pub fn join_supervisor(&self) -> &JoinSupervisor<S> {
        &self.join
    }

    pub fn is_achieved(&self, point: SyncPoint) -> bool {
        self.sync.is_achieved(point)
    }

    pub fn class_index(&self) -> Option<ClassHierarchyIndex<'_>> {
        self.object_model.as_ref().map(ClassHierarchyIndex::new)
    }

    /// Interaction classes this federate publishes; empty without an object model
    pub fn interaction_publish(&self) -> InterestSet<'_> {
        self.class_index()
            .map(|index| index.publish_set())
            .unwrap_or_default()
    }

    /// Interaction classes this federate subscribes to; empty without an object model
    pub fn interaction_subscribe(&self) -> InterestSet<'_> {
        self.class_index()
            .map(|index| index.subscribe_set())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    /// CONSTRUCTED -> INITIALIZED: hand the runtime our callback state
    pub fn initialize(&mut self) -> FederateResult<()> {
        self.require(LifecycleState::Constructed)?;
        let callbacks = Arc::clone(self.time.callbacks());
        self.gateway.connect(callbacks).map_err(FederateError::Gateway)?;
        self.transition(LifecycleState::Initialized)
    }

    /// INITIALIZED -> JOINED, retrying per the join policy
    pub fn join(&mut self) -> FederateResult<FederateHandle> {
        self.require(LifecycleState::Initialized)?;
        let receipt = self.join.join(&mut self.gateway, &self.identity)?;
        self.handle = Some(receipt.handle);
        self.transition(LifecycleState::Joined)?;
        Ok(receipt.handle)
    }

    /// Enable time constrained then time regulating
    ///
    /// Failures surface immediately; they are configuration or programming
    /// errors, not federation availability problems.
    pub fn enable_time_management(&mut self) -> FederateResult<(EnableStatus, EnableStatus)> {
        self.require(LifecycleState::Joined)?;
        let constrained = self.time.enable_constrained(&mut self.gateway)?;
        let regulating = self.time.enable_regulating(&mut self.gateway)?;
        Ok((constrained, regulating))
    }

    /// Achieve readyToPopulate, then run the populate hook
    pub fn ready_to_populate<H: FederateHooks<G>>(&mut self, hooks: &mut H) -> FederateResult<()> {
        let point = SyncPoint::ReadyToPopulate;
        self.begin(point)?;
        self.time.synchronize(&mut self.gateway, point)?;
        self.invoke(point, |ctx| hooks.ready_to_populate(ctx))
    }

    /// Enable time management if configured, achieve readyToRun, then run
    /// the simulation hook
    pub fn ready_to_run<H: FederateHooks<G>>(&mut self, hooks: &mut H) -> FederateResult<()> {
        let point = SyncPoint::ReadyToRun;
        self.begin(point)?;
        if self.config.time_management {
            self.enable_time_management()?;
        }
        if self.config.asynchronous_delivery {
            self.time.enable_asynchronous_delivery(&mut self.gateway)?;
        }
        self.time.synchronize(&mut self.gateway, point)?;
        self.invoke(point, |ctx| hooks.ready_to_run(ctx))
    }

    /// Achieve readyToResign, then resign and terminate
    pub fn ready_to_resign(&mut self) -> FederateResult<()> {
        let point = SyncPoint::ReadyToResign;
        self.begin(point)?;
        self.time.synchronize(&mut self.gateway, point)?;
        self.terminate();
        Ok(())
    }

    /// Best-effort move to TERMINATING, resigning first if joined
    ///
    /// Safe to call from any state and more than once.
    pub fn terminate(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        if self.state == LifecycleState::Joined {
            if let Err(e) = self.gateway.resign_federation_execution() {
                warn!(error = %e, "resign failed");
            }
        }
        let from = self.state;
        self.state = LifecycleState::Terminating;
        info!(federate = %self.identity, %from, to = %self.state, "lifecycle transition");
    }

    /// Drive the whole lifecycle
    ///
    /// On any failure the federate still terminates before the original
    /// error is returned.
    pub fn run<H: FederateHooks<G>>(&mut self, hooks: &mut H) -> FederateResult<()> {
        let result = self.run_phases(hooks);
        if let Err(e) = &result {
            error!(federate = %self.identity, state = %self.state, error = %e, "federate failed");
            self.terminate();
        }
        result
    }

    fn run_phases<H: FederateHooks<G>>(&mut self, hooks: &mut H) -> FederateResult<()> {
        self.initialize()?;
        self.join()?;
        self.ready_to_populate(hooks)?;
        self.ready_to_run(hooks)?;
        self.ready_to_resign()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn require(&self, required: LifecycleState) -> Result<(), ContractViolation> {
        if self.state != required {
            return Err(ContractViolation::WrongState {
                required,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn transition(&mut self, next: LifecycleState) -> FederateResult<()> {
        let from = self.state;
        self.state = from.transition(next)?;
        info!(federate = %self.identity, %from, to = %next, "lifecycle transition");
        Ok(())
    }

    /// Claim `point`; it counts as achieved even if what follows fails
    fn begin(&mut self, point: SyncPoint) -> FederateResult<()> {
        self.require(LifecycleState::Joined)?;
        self.sync.achieve(point)?;
        Ok(())
    }

    fn invoke<F>(&mut self, point: SyncPoint, hook: F) -> FederateResult<()>
    where
        F: FnOnce(&mut FederateContext<'_, G>) -> Result<(), HookError>,
    {
        let mut ctx = FederateContext {
            identity: &self.identity,
            handle: self.handle,
            gateway: &mut self.gateway,
            time: &mut self.time,
            object_model: self.object_model.as_ref(),
        };
        info!(%point, "invoking hook");
        hook(&mut ctx).map_err(|source| FederateError::Hook { point, source })
    }
}
