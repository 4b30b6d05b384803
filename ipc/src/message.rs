//! Bus messages and the addressing convention layered on top of them
//!
//! The bus only knows `(sender, topic, payload)`. Requests and responses are
//! told apart purely by what sits in those fields:
//!
//! ```text
//! request:  sender = <callee id>          topic = "rpc.<correlation token>"
//! response: sender = <correlation token>  topic = "rpc.<callee id>"
//! ```
//!
//! Receivers split the topic at its first separator only; everything after it
//! is the routing key, so dotted service identifiers survive intact.

use crate::bus::{Bus, BusError};
use core_types::{CorrelationToken, IdError, ServiceId, PATH_SEPARATOR};
use std::fmt;
use thiserror::Error;

/// Namespace prefixed to every topic published by this protocol
pub const TOPIC_NAMESPACE: &str = "rpc";

/// Returns the routing key of a topic: everything after the first separator
pub fn routing_key(topic: &str) -> Option<&str> {
    topic
        .split_once(PATH_SEPARATOR)
        .map(|(_, key)| key)
        .filter(|key| !key.is_empty())
}

/// Builds a topic carrying `key` as its routing key
pub fn topic_for(key: &str) -> String {
    format!("{}{}{}", TOPIC_NAMESPACE, PATH_SEPARATOR, key)
}

/// The only object actually exchanged over the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Sender field (a service identifier or a correlation token)
    pub sender: String,
    /// Topic (namespace + routing key)
    pub topic: String,
    /// Encoded envelope
    pub payload: String,
}

impl BusMessage {
    /// Creates a new bus message
    pub fn new(
        sender: impl Into<String>,
        topic: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Returns this message's routing key
    pub fn routing_key(&self) -> Option<&str> {
        routing_key(&self.topic)
    }

    /// Publishes this message on a bus
    pub fn publish_on(&self, bus: &dyn Bus) -> Result<(), BusError> {
        bus.publish(&self.sender, &self.topic, &self.payload)
    }
}

impl fmt::Display for BusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({} bytes)", self.sender, self.topic, self.payload.len())
    }
}

/// Errors produced when a message does not follow the addressing convention
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("topic {0:?} carries no routing key")]
    MissingRoutingKey(String),

    #[error("invalid sender: {0}")]
    InvalidSender(IdError),

    #[error("invalid routing key: {0}")]
    InvalidRoutingKey(IdError),
}

/// Address of a request: which service must answer and which token to answer to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestAddress {
    pub callee: ServiceId,
    pub token: CorrelationToken,
}

impl RequestAddress {
    /// Creates a request address
    pub fn new(callee: ServiceId, token: CorrelationToken) -> Self {
        Self { callee, token }
    }

    /// Builds the bus message for this request
    pub fn to_message(&self, payload: impl Into<String>) -> BusMessage {
        BusMessage::new(
            self.callee.as_str(),
            topic_for(self.token.as_str()),
            payload,
        )
    }

    /// Recovers a request address from raw bus fields
    pub fn parse(sender: &str, topic: &str) -> Result<Self, AddressError> {
        let callee = ServiceId::new(sender).map_err(AddressError::InvalidSender)?;
        let key =
            routing_key(topic).ok_or_else(|| AddressError::MissingRoutingKey(topic.to_string()))?;
        let token = CorrelationToken::parse(key).map_err(AddressError::InvalidRoutingKey)?;
        Ok(Self { callee, token })
    }

    /// The address the matching response must be published to
    pub fn reply_address(&self) -> ResponseAddress {
        ResponseAddress::new(self.token.clone(), self.callee.clone())
    }
}

/// Address of a response: which pending call it completes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAddress {
    pub token: CorrelationToken,
    pub callee: ServiceId,
}

impl ResponseAddress {
    /// Creates a response address
    pub fn new(token: CorrelationToken, callee: ServiceId) -> Self {
        Self { token, callee }
    }

    /// Builds the bus message for this response
    pub fn to_message(&self, payload: impl Into<String>) -> BusMessage {
        BusMessage::new(
            self.token.as_str(),
            topic_for(self.callee.as_str()),
            payload,
        )
    }

    /// Checks whether raw bus fields address this pending call
    ///
    /// `sender` must equal the token and the routing key must equal the
    /// callee that was asked.
    pub fn matches(&self, sender: &str, topic: &str) -> bool {
        sender == self.token.as_str() && routing_key(topic) == Some(self.callee.as_str())
    }
}
