//! Identifiers for bus participants and in-flight calls

use crate::uuid_tools::{new_uuid, to_simple_string};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when parsing identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("service identifier must not be empty")]
    EmptyServiceId,

    #[error("service identifier must not contain whitespace: {0:?}")]
    InvalidServiceId(String),

    #[error("invalid correlation token: {0:?}")]
    InvalidToken(String),
}

/// Stable identifier of a service (its address on the bus)
///
/// Assigned once when the process starts and immutable afterwards.
/// Identifiers may be dotted (`plugin.video.example`): routing never splits
/// an identifier, it only splits a topic at its first separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceId(String);

impl ServiceId {
    /// Creates a service ID, rejecting empty or whitespace-bearing input
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::EmptyServiceId);
        }
        if id.chars().any(char::is_whitespace) {
            return Err(IdError::InvalidServiceId(id));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as it appears on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServiceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ServiceId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ServiceId {
    type Error = IdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ServiceId> for String {
    fn from(id: ServiceId) -> Self {
        id.0
    }
}

impl AsRef<str> for ServiceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique token identifying one request/response pair
///
/// A fresh token is minted for every outgoing call and discarded once the
/// matching response (or a terminal failure) is observed. Minted tokens are
/// random UUIDs; a token received from the bus is opaque text and is echoed
/// back exactly as it arrived.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Mints a new random token
    pub fn new() -> Self {
        Self::from_uuid(new_uuid())
    }

    /// Creates a token from a UUID, in its simple lowercase form
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(to_simple_string(uuid))
    }

    /// Wraps a token received from the bus without altering its spelling
    pub fn parse(text: &str) -> Result<Self, IdError> {
        if text.is_empty() {
            return Err(IdError::InvalidToken(text.to_string()));
        }
        Ok(Self(text.to_string()))
    }

    /// Returns the wire form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
