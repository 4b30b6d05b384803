//! Error types for callers, services and configuration

use core_types::PathError;
use identity::IdentityError;
use ipc::{BusError, EnvelopeError, ErrorCode};
use method_registry::RegistryError;
use std::time::Duration;
use thiserror::Error;

/// Why a call did not produce a result
#[derive(Debug, Error)]
pub enum RpcError {
    /// The callee has no method at `path`
    #[error("remote error: {message}")]
    UnknownMethod { path: String, message: String },

    /// The callee reported a failure
    #[error("remote error: {message}")]
    Remote { kind: ErrorCode, message: String },

    #[error("call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("call aborted")]
    Aborted,

    #[error("invalid response: {0}")]
    InvalidResponse(#[source] EnvelopeError),

    #[error("invalid method path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("failed to encode request: {0}")]
    Encode(#[source] EnvelopeError),

    #[error("result has an unexpected shape: {0}")]
    UnexpectedResult(#[source] serde_json::Error),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),
}

impl RpcError {
    /// Whether the failure was reported by the callee
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            RpcError::UnknownMethod { .. } | RpcError::Remote { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RpcError::Timeout { .. })
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RpcError::Aborted)
    }
}

/// Failures starting or running a serve cycle
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("service is already serving")]
    AlreadyServing,

    #[error("registration failed: {0}")]
    Registry(#[from] RegistryError),

    #[error("cannot resolve service identity: {0}")]
    Identity(#[from] IdentityError),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
