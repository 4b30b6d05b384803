//! # Inter-Process Communication (IPC)
//!
//! This crate defines the wire protocol that turns a broadcast-only bus into
//! a request/response channel.
//!
//! ## Philosophy
//!
//! - **Broadcast, filter locally**: The bus delivers every message to every
//!   subscriber; each participant keeps only what is addressed to it.
//! - **One equality check per side**: Addressing puts the destination in
//!   `sender` so a dispatcher or a waiting caller filters with a single
//!   string comparison.
//! - **Structured, validated payloads**: Envelopes are JSON objects whose
//!   shape is checked on decode; malformed input is an error value, never a
//!   panic.
//!
//! ## Architecture
//!
//! - [`bus`]: the [`Bus`]/[`BusListener`] seam and the in-memory [`LocalBus`]
//! - [`message`]: [`BusMessage`] and the request/response addressing rules
//! - [`envelope`]: [`RequestEnvelope`] / [`ResponseEnvelope`] and their codec

pub mod bus;
pub mod envelope;
pub mod message;

pub use bus::{Bus, BusError, BusListener, DeliveryMode, LocalBus, Subscription, SubscriptionId};
pub use envelope::{EnvelopeError, ErrorCode, RequestEnvelope, ResponseEnvelope};
pub use message::{
    routing_key, topic_for, AddressError, BusMessage, RequestAddress, ResponseAddress,
    TOPIC_NAMESPACE,
};
