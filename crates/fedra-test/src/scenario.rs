//! End-to-end federate scenarios
//!
//! A scenario wires a [`ScriptedGateway`] and a [`RecordingSleeper`] into a
//! [`FederateLifecycle`], runs it to completion and reports what happened.

use fedra_core::{
    FederateError, FederateResult, HookError, InteractionClass, LifecycleState, LogicalTime,
    SyncPoint,
};
use fedra_runtime::{FederateConfig, FederateContext, FederateHooks, FederateLifecycle};
use tracing::info;

use crate::{RecordingSleeper, ScriptedGateway};

/// Something the application hooks observed
#[derive(Clone, Debug, PartialEq)]
pub enum HookEvent {
    Populate {
        time: LogicalTime,
        constrained: bool,
        regulating: bool,
    },
    Run {
        time: LogicalTime,
        constrained: bool,
        regulating: bool,
    },
    Advanced(LogicalTime),
    Published(Vec<String>),
}

/// Hooks that record every phase and advance time a fixed number of steps
#[derive(Debug, Default)]
pub struct RecordingHooks {
    pub events: Vec<HookEvent>,
    /// Steps to advance inside `ready_to_run`
    pub advances: u32,
    /// Fail this hook with a message
    pub fail_at: Option<SyncPoint>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advancing(steps: u32) -> Self {
        RecordingHooks {
            advances: steps,
            ..Default::default()
        }
    }

    pub fn failing_at(point: SyncPoint) -> Self {
        RecordingHooks {
            fail_at: Some(point),
            ..Default::default()
        }
    }

    /// Phases reached, in order
    pub fn phases(&self) -> Vec<SyncPoint> {
        self.events
            .iter()
            .filter_map(|event| match event {
                HookEvent::Populate { .. } => Some(SyncPoint::ReadyToPopulate),
                HookEvent::Run { .. } => Some(SyncPoint::ReadyToRun),
                _ => None,
            })
            .collect()
    }

    fn check(&self, point: SyncPoint) -> Result<(), HookError> {
        if self.fail_at == Some(point) {
            return Err(format!("{} hook failed on purpose", point).into());
        }
        Ok(())
    }
}

impl FederateHooks<ScriptedGateway> for RecordingHooks {
    fn ready_to_populate(
        &mut self,
        ctx: &mut FederateContext<'_, ScriptedGateway>,
    ) -> Result<(), HookError> {
        self.check(SyncPoint::ReadyToPopulate)?;
        info!(federate = %ctx.identity(), "populating");
        if let Some(index) = ctx.class_index() {
            let names = index.publish_set().names().into_iter().map(String::from).collect();
            self.events.push(HookEvent::Published(names));
        }
        self.events.push(HookEvent::Populate {
            time: ctx.logical_time(),
            constrained: ctx.gateway().calls().enable_constrained > 0,
            regulating: ctx.gateway().calls().enable_regulating > 0,
        });
        Ok(())
    }

    fn ready_to_run(
        &mut self,
        ctx: &mut FederateContext<'_, ScriptedGateway>,
    ) -> Result<(), HookError> {
        self.check(SyncPoint::ReadyToRun)?;
        self.events.push(HookEvent::Run {
            time: ctx.logical_time(),
            constrained: ctx.gateway().calls().enable_constrained > 0,
            regulating: ctx.gateway().calls().enable_regulating > 0,
        });
        for _ in 0..self.advances {
            let time = ctx.advance_time()?;
            self.events.push(HookEvent::Advanced(time));
        }
        Ok(())
    }
}

/// A configured federate run against a scripted federation
pub struct Scenario {
    config: FederateConfig,
    gateway: ScriptedGateway,
    object_model: Option<InteractionClass>,
}

/// What a finished scenario left behind
pub struct ScenarioReport {
    pub result: FederateResult<()>,
    pub federate: FederateLifecycle<ScriptedGateway, RecordingSleeper>,
    pub sleeper: RecordingSleeper,
    pub hooks: RecordingHooks,
}

impl ScenarioReport {
    pub fn state(&self) -> LifecycleState {
        self.federate.state()
    }

    pub fn gateway(&self) -> &ScriptedGateway {
        self.federate.gateway()
    }

    pub fn error(&self) -> Option<&FederateError> {
        self.result.as_ref().err()
    }
}

impl Scenario {
    pub fn new(config: FederateConfig, gateway: ScriptedGateway) -> Self {
        Scenario {
            config,
            gateway,
            object_model: None,
        }
    }

    pub fn with_object_model(mut self, root: InteractionClass) -> Self {
        self.object_model = Some(root);
        self
    }

    /// Run the whole lifecycle with `hooks`
    pub fn run(self, mut hooks: RecordingHooks) -> FederateResult<ScenarioReport> {
        let sleeper = RecordingSleeper::new();
        let mut federate = FederateLifecycle::with_sleeper(self.gateway, self.config, sleeper.clone())?;
        if let Some(model) = self.object_model {
            federate = federate.with_object_model(model);
        }
        let result = federate.run(&mut hooks);
        Ok(ScenarioReport {
            result,
            federate,
            sleeper,
            hooks,
        })
    }
}
