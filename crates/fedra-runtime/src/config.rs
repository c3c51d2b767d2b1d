//! Federate configuration
//!
//! Values are read once at start-up. The struct is serde-enabled so any
//! file format can feed it; [`FederateConfig::from_env`] overlays `FEDRA_*`
//! environment variables on the defaults.

use std::env;

use fedra_core::{
    FederateError, FederateIdentity, FederateName, FederateResult, FederationName, PollBudget,
    TimeParameters,
};
use fedra_time::CoordinatorConfig;
use serde::{Deserialize, Serialize};

use crate::JoinPolicy;

/// Federate configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FederateConfig {
    /// Name this federate joins under
    pub federate_name: String,
    /// Federation execution to join
    pub federation_name: String,
    /// Logical time per advance
    pub step_size: f64,
    /// Lookahead offered when regulating
    pub lookahead: f64,
    /// Join retry policy
    pub join: JoinPolicy,
    /// Enable time constrained + regulating before readyToRun
    pub time_management: bool,
    /// Enable asynchronous delivery before readyToRun
    pub asynchronous_delivery: bool,
    /// Wall-clock budget per callback pump
    pub poll_budget: PollBudget,
    /// Give up a poll loop after this many pumps; unbounded when absent
    pub poll_limit: Option<u64>,
}

impl Default for FederateConfig {
    fn default() -> Self {
        let time = TimeParameters::default();
        FederateConfig {
            federate_name: String::new(),
            federation_name: String::new(),
            step_size: time.step_size,
            lookahead: time.lookahead,
            join: JoinPolicy::default(),
            time_management: true,
            asynchronous_delivery: false,
            poll_budget: PollBudget::default(),
            poll_limit: None,
        }
    }
}

impl FederateConfig {
    /// Defaults for everything but the names
    pub fn new(federate_name: impl Into<String>, federation_name: impl Into<String>) -> Self {
        FederateConfig {
            federate_name: federate_name.into(),
            federation_name: federation_name.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FEDRA_FEDERATE_NAME`: federate name (required)
    /// - `FEDRA_FEDERATION_NAME`: federation name (required)
    /// - `FEDRA_STEP_SIZE`: logical step size (default: 1.0)
    /// - `FEDRA_LOOKAHEAD`: lookahead (default: 1.0)
    /// - `FEDRA_JOIN_ATTEMPTS`: join attempts (default: 6)
    /// - `FEDRA_JOIN_RETRY_DELAY`: delay between joins, e.g. `10s` (default: 10s)
    /// - `FEDRA_TIME_MANAGEMENT`: enable constrained/regulating (default: true)
    /// - `FEDRA_ASYNC_DELIVERY`: enable asynchronous delivery (default: false)
    /// - `FEDRA_POLL_LIMIT`: max pumps per wait (default: unbounded)
    pub fn from_env() -> FederateResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// As [`from_env`](Self::from_env), reading through `lookup`
    pub fn from_lookup<F>(lookup: F) -> FederateResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("FEDRA_FEDERATE_NAME") {
            config.federate_name = v;
        }
        if let Some(v) = lookup("FEDRA_FEDERATION_NAME") {
            config.federation_name = v;
        }
        if let Some(v) = lookup("FEDRA_STEP_SIZE") {
            config.step_size = parse_var("FEDRA_STEP_SIZE", &v)?;
        }
        if let Some(v) = lookup("FEDRA_LOOKAHEAD") {
            config.lookahead = parse_var("FEDRA_LOOKAHEAD", &v)?;
        }
        if let Some(v) = lookup("FEDRA_JOIN_ATTEMPTS") {
            config.join.max_attempts = parse_var("FEDRA_JOIN_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("FEDRA_JOIN_RETRY_DELAY") {
            config.join.retry_delay = humantime::parse_duration(&v).map_err(|e| {
                FederateError::InvalidConfig(format!("FEDRA_JOIN_RETRY_DELAY={}: {}", v, e))
            })?;
        }
        if let Some(v) = lookup("FEDRA_TIME_MANAGEMENT") {
            config.time_management = parse_flag(&v);
        }
        if let Some(v) = lookup("FEDRA_ASYNC_DELIVERY") {
            config.asynchronous_delivery = parse_flag(&v);
        }
        if let Some(v) = lookup("FEDRA_POLL_LIMIT") {
            config.poll_limit = Some(parse_var("FEDRA_POLL_LIMIT", &v)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FederateResult<()> {
        self.identity()?;
        self.time_parameters().validate()?;
        self.join.validate()?;
        self.poll_budget.validate()?;
        if self.poll_limit == Some(0) {
            return Err(FederateError::InvalidConfig(
                "poll limit must allow at least one poll".into(),
            ));
        }
        Ok(())
    }

    pub fn identity(&self) -> FederateResult<FederateIdentity> {
        Ok(FederateIdentity::new(
            FederateName::new(self.federate_name.clone())?,
            FederationName::new(self.federation_name.clone())?,
        ))
    }

    pub fn time_parameters(&self) -> TimeParameters {
        TimeParameters {
            step_size: self.step_size,
            lookahead: self.lookahead,
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            params: self.time_parameters(),
            budget: self.poll_budget,
            poll_limit: self.poll_limit,
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> FederateResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| FederateError::InvalidConfig(format!("{}={}: {}", key, value, e)))
}

fn parse_flag(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes"
}

/// Serde adapter for human-readable durations (`10s`, `250ms`)
pub mod humantime_duration {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(D::Error::custom)
    }
}
