//! Identity types for FEDRA federates
//!
//! Names are validated at construction: the runtime rejects empty federate
//! and federation names, so we never let one reach the gateway.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FederateError, FederateResult};

/// Federate name - the role under which this participant joins
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FederateName(String);

impl FederateName {
    pub fn new(name: impl Into<String>) -> FederateResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FederateError::InvalidConfig(
                "federate name must not be empty".into(),
            ));
        }
        Ok(FederateName(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FederateName {
    type Error = FederateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FederateName::new(value)
    }
}

impl From<FederateName> for String {
    fn from(name: FederateName) -> Self {
        name.0
    }
}

impl fmt::Debug for FederateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Federate({})", self.0)
    }
}

impl fmt::Display for FederateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Federation name - the federation execution to join
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FederationName(String);

impl FederationName {
    pub fn new(name: impl Into<String>) -> FederateResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FederateError::InvalidConfig(
                "federation name must not be empty".into(),
            ));
        }
        Ok(FederationName(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FederationName {
    type Error = FederateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        FederationName::new(value)
    }
}

impl From<FederationName> for String {
    fn from(name: FederationName) -> Self {
        name.0
    }
}

impl fmt::Debug for FederationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Federation({})", self.0)
    }
}

impl fmt::Display for FederationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle assigned by the runtime on a successful join
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FederateHandle(pub u64);

impl FederateHandle {
    #[inline]
    pub fn new(id: u64) -> Self {
        FederateHandle(id)
    }
}

impl fmt::Debug for FederateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.0)
    }
}

impl fmt::Display for FederateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Federate identity: who we are and where we are joining
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FederateIdentity {
    pub federate: FederateName,
    pub federation: FederationName,
}

impl FederateIdentity {
    pub fn new(federate: FederateName, federation: FederationName) -> Self {
        FederateIdentity {
            federate,
            federation,
        }
    }
}

impl fmt::Display for FederateIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.federate, self.federation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_names_rejected() {
        assert!(FederateName::new("").is_err());
        assert!(FederateName::new("   ").is_err());
        assert!(FederationName::new("").is_err());
    }

    #[test]
    fn test_identity_display() {
        let identity = FederateIdentity::new(
            FederateName::new("Sim-A").unwrap(),
            FederationName::new("Ex-1").unwrap(),
        );
        assert_eq!(identity.to_string(), "Sim-A@Ex-1");
    }

    #[test]
    fn test_name_deserialize_validates() {
        let ok: Result<FederateName, _> = serde_json::from_str("\"Sim-A\"");
        assert_eq!(ok.unwrap().as_str(), "Sim-A");

        let empty: Result<FederateName, _> = serde_json::from_str("\"\"");
        assert!(empty.is_err());
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(FederateHandle::new(255).to_string(), "0xff");
    }
}
