//! Join Supervisor - bounded-retry federation join
//!
//! Federates are usually started alongside the process that creates the
//! federation execution. Until it exists, joins fail recoverably; the
//! supervisor waits a fixed delay and tries again, up to a fixed budget.

use std::time::Duration;

use fedra_core::{FederateError, FederateIdentity, FederateResult, JoinReceipt, RuntimeGateway};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::humantime_duration;

/// Default join attempt budget
pub const DEFAULT_MAX_JOIN_ATTEMPTS: u32 = 6;

/// Default delay between join attempts
pub const DEFAULT_REJOIN_DELAY: Duration = Duration::from_millis(10_000);

/// Retry policy for joining a federation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinPolicy {
    /// Total attempts, the first one included
    pub max_attempts: u32,
    /// Delay between consecutive attempts
    #[serde(with = "humantime_duration")]
    pub retry_delay: Duration,
}

impl JoinPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        JoinPolicy {
            max_attempts,
            retry_delay,
        }
    }

    pub fn validate(&self) -> FederateResult<()> {
        if self.max_attempts == 0 {
            return Err(FederateError::InvalidConfig(
                "join policy needs at least one attempt".into(),
            ));
        }
        Ok(())
    }

    /// Longest time a join can spend sleeping, saturating at `Duration::MAX`
    pub fn worst_case_delay(&self) -> Duration {
        self.retry_delay
            .checked_mul(self.max_attempts.saturating_sub(1))
            .unwrap_or(Duration::MAX)
    }
}

impl Default for JoinPolicy {
    fn default() -> Self {
        JoinPolicy {
            max_attempts: DEFAULT_MAX_JOIN_ATTEMPTS,
            retry_delay: DEFAULT_REJOIN_DELAY,
        }
    }
}

/// Blocks the calling thread between join attempts
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<S: Sleeper + ?Sized> Sleeper for &mut S {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// Join Supervisor - retries recoverable join failures
#[derive(Debug)]
pub struct JoinSupervisor<S = ThreadSleeper> {
    policy: JoinPolicy,
    sleeper: S,
    /// Attempts made by the last `join` call
    attempts: u32,
}

impl JoinSupervisor<ThreadSleeper> {
    pub fn new(policy: JoinPolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }
}

impl<S: Sleeper> JoinSupervisor<S> {
    pub fn with_sleeper(policy: JoinPolicy, sleeper: S) -> Self {
        JoinSupervisor {
            policy,
            sleeper,
            attempts: 0,
        }
    }

    pub fn policy(&self) -> &JoinPolicy {
        &self.policy
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// A single join attempt, classifying the failure
    ///
    /// Recoverable failures come back as [`FederateError::RecoverableJoin`],
    /// everything else as [`FederateError::JoinRejected`].
    pub fn attempt<G>(&mut self, gateway: &mut G, identity: &FederateIdentity) -> FederateResult<JoinReceipt>
    where
        G: RuntimeGateway + ?Sized,
    {
        self.attempts += 1;
        info!(
            federate = %identity.federate,
            federation = %identity.federation,
            attempt = self.attempts,
            "joining federation"
        );
        gateway
            .join_federation_execution(&identity.federate, &identity.federation)
            .map_err(|e| {
                if e.is_recoverable() {
                    FederateError::RecoverableJoin(e)
                } else {
                    FederateError::JoinRejected(e)
                }
            })
    }

    /// Join, retrying recoverable failures per the policy
    ///
    /// Makes at most `max_attempts` attempts and sleeps `retry_delay`
    /// between consecutive ones, never after the last.
    pub fn join<G>(&mut self, gateway: &mut G, identity: &FederateIdentity) -> FederateResult<JoinReceipt>
    where
        G: RuntimeGateway + ?Sized,
    {
        self.policy.validate()?;
        self.attempts = 0;

        loop {
            match self.attempt(gateway, identity) {
                Ok(receipt) => {
                    info!(
                        federate = %identity.federate,
                        handle = %receipt.handle,
                        attempts = self.attempts,
                        "joined federation"
                    );
                    return Ok(receipt);
                }
                Err(FederateError::RecoverableJoin(cause)) => {
                    let remaining = self.policy.max_attempts.saturating_sub(self.attempts);
                    if remaining == 0 {
                        error!(attempts = self.attempts, error = %cause, "join attempts exhausted");
                        return Err(FederateError::JoinExhausted {
                            attempts: self.attempts,
                            last: cause,
                        });
                    }
                    warn!(
                        error = %cause,
                        attempt = self.attempts,
                        remaining,
                        delay = ?self.policy.retry_delay,
                        "join failed, retrying"
                    );
                    self.sleeper.sleep(self.policy.retry_delay);
                }
                Err(e) => {
                    error!(error = %e, "join aborted");
                    return Err(e);
                }
            }
        }
    }
}
