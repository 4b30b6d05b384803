//! # Core Types
//!
//! This crate defines the identifiers shared by every participant on the bus.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: Addresses, tokens and method paths are
//!   distinct types and cannot be confused with each other or with free text.
//! - **Validated at the edge**: A value of these types is always well-formed;
//!   parsing is where untrusted strings are rejected.
//!
//! ## Key Types
//!
//! - [`ServiceId`]: Stable identifier (address) of a process/service
//! - [`CorrelationToken`]: Per-call random token that routes exactly one response
//! - [`MethodPath`]: Dotted path naming a remotely callable method

pub mod ids;
pub mod path;
pub mod uuid_tools;

pub use ids::{CorrelationToken, IdError, ServiceId};
pub use path::{MethodPath, PathError, PATH_SEPARATOR};
