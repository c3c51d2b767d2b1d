//! Time primitives for FEDRA federates
//!
//! Two notions of time meet at the gateway boundary:
//! - Logical time: the federation's simulation clock, advanced only by grants
//! - Poll budget: wall-clock bounds for one callback pump (not simulation time)

use std::fmt;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::{FederateError, FederateResult};

/// Logical (simulation) time
/// INVARIANT: a federate's logical time never decreases
#[derive(Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct LogicalTime(f64);

impl LogicalTime {
    pub const ZERO: LogicalTime = LogicalTime(0.0);

    #[inline]
    pub fn new(value: f64) -> Self {
        LogicalTime(value)
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl Add<f64> for LogicalTime {
    type Output = LogicalTime;

    #[inline]
    fn add(self, rhs: f64) -> Self::Output {
        LogicalTime(self.0 + rhs)
    }
}

impl fmt::Debug for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t({})", self.0)
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookahead interval handed to the runtime when enabling regulation
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct LookaheadInterval(f64);

impl LookaheadInterval {
    #[inline]
    pub fn new(value: f64) -> Self {
        LookaheadInterval(value)
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0
    }
}

/// Step size and lookahead, fixed at configuration time
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeParameters {
    /// Logical time requested per advance
    pub step_size: f64,
    /// Lookahead offered when regulating
    pub lookahead: f64,
}

impl TimeParameters {
    pub fn new(step_size: f64, lookahead: f64) -> FederateResult<Self> {
        let params = TimeParameters {
            step_size,
            lookahead,
        };
        params.validate()?;
        Ok(params)
    }

    /// Both values must be positive and finite
    pub fn validate(&self) -> FederateResult<()> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(FederateError::InvalidConfig(format!(
                "step size must be positive, got {}",
                self.step_size
            )));
        }
        if !(self.lookahead.is_finite() && self.lookahead > 0.0) {
            return Err(FederateError::InvalidConfig(format!(
                "lookahead must be positive, got {}",
                self.lookahead
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn lookahead_interval(&self) -> LookaheadInterval {
        LookaheadInterval::new(self.lookahead)
    }
}

impl Default for TimeParameters {
    fn default() -> Self {
        TimeParameters {
            step_size: 1.0,
            lookahead: 1.0,
        }
    }
}

/// Wall-clock bounds for a single callback pump, in seconds
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollBudget {
    pub min: f64,
    pub max: f64,
}

impl PollBudget {
    pub fn new(min: f64, max: f64) -> FederateResult<Self> {
        let budget = PollBudget { min, max };
        budget.validate()?;
        Ok(budget)
    }

    pub fn validate(&self) -> FederateResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min < 0.0 || self.min > self.max
        {
            return Err(FederateError::InvalidConfig(format!(
                "poll budget must satisfy 0 <= min <= max, got [{}, {}]",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        PollBudget { min: 0.1, max: 0.2 }
    }
}
