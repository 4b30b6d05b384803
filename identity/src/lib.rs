//! # Identity
//!
//! This crate resolves the stable identifier a process answers to on the bus.
//!
//! ## Philosophy
//!
//! - **Identity is resolved once**: A service looks its identifier up at
//!   start-up and keeps it for its whole lifetime
//! - **Identity does NOT grant authority by itself**: It is an address, not a
//!   credential
//! - **Testability first; no hidden global state**: Resolution goes through
//!   the [`IdentityResolver`] trait so tests can pin an identifier
//!
//! ## Resolvers
//!
//! - [`FixedIdentity`]: A known identifier
//! - [`EnvIdentity`]: Read from an environment variable
//! - [`ProcessIdentity`]: Derived from the running executable's name
//! - [`FallbackIdentity`]: First resolver that succeeds

use core_types::{IdError, ServiceId};
use std::env;
use thiserror::Error;

/// Environment variable consulted by [`EnvIdentity::default`]
pub const DEFAULT_IDENTITY_VAR: &str = "BUSRPC_SERVICE_ID";

/// Identity resolution errors
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("environment variable {0} is not set")]
    NotSet(String),

    #[error("invalid identifier: {0}")]
    Invalid(#[from] IdError),

    #[error("cannot determine executable name: {0}")]
    Executable(String),

    #[error("no identity resolver succeeded")]
    Exhausted,
}

/// Looks up this process's own stable identifier
pub trait IdentityResolver {
    fn resolve(&self) -> Result<ServiceId, IdentityError>;
}

impl<R: IdentityResolver + ?Sized> IdentityResolver for Box<R> {
    fn resolve(&self) -> Result<ServiceId, IdentityError> {
        (**self).resolve()
    }
}

/// A resolver that always returns the same identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedIdentity(ServiceId);

impl FixedIdentity {
    pub fn new(id: ServiceId) -> Self {
        Self(id)
    }
}

impl IdentityResolver for FixedIdentity {
    fn resolve(&self) -> Result<ServiceId, IdentityError> {
        Ok(self.0.clone())
    }
}

/// Reads the identifier from an environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvIdentity {
    var: String,
}

impl EnvIdentity {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITY_VAR)
    }
}

impl IdentityResolver for EnvIdentity {
    fn resolve(&self) -> Result<ServiceId, IdentityError> {
        let value = env::var(&self.var).map_err(|_| IdentityError::NotSet(self.var.clone()))?;
        Ok(ServiceId::new(value.trim())?)
    }
}

/// Uses the running executable's file stem as the identifier
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessIdentity;

impl IdentityResolver for ProcessIdentity {
    fn resolve(&self) -> Result<ServiceId, IdentityError> {
        let exe = env::current_exe().map_err(|err| IdentityError::Executable(err.to_string()))?;
        let stem = exe
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| IdentityError::Executable(exe.display().to_string()))?;
        Ok(ServiceId::new(stem)?)
    }
}

/// Tries each resolver in order and returns the first identifier found
#[derive(Default)]
pub struct FallbackIdentity {
    resolvers: Vec<Box<dyn IdentityResolver + Send + Sync>>,
}

impl FallbackIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a resolver to the chain
    pub fn or(mut self, resolver: impl IdentityResolver + Send + Sync + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    /// Environment variable first, then the executable name
    pub fn standard() -> Self {
        Self::new().or(EnvIdentity::default()).or(ProcessIdentity)
    }
}

impl IdentityResolver for FallbackIdentity {
    fn resolve(&self) -> Result<ServiceId, IdentityError> {
        for resolver in &self.resolvers {
            match resolver.resolve() {
                Ok(id) => return Ok(id),
                Err(err) => tracing::debug!(error = %err, "identity resolver skipped"),
            }
        }
        Err(IdentityError::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_identity() {
        let id = ServiceId::new("calculator").unwrap();
        assert_eq!(FixedIdentity::new(id.clone()).resolve().unwrap(), id);
    }

    #[test]
    fn test_env_identity_reads_variable() {
        env::set_var("BUSRPC_TEST_IDENTITY_SET", " plugin.video.example ");
        let id = EnvIdentity::new("BUSRPC_TEST_IDENTITY_SET").resolve().unwrap();
        assert_eq!(id.as_str(), "plugin.video.example");
    }

    #[test]
    fn test_env_identity_missing_variable() {
        let result = EnvIdentity::new("BUSRPC_TEST_IDENTITY_MISSING").resolve();
        assert!(matches!(result, Err(IdentityError::NotSet(var)) if var == "BUSRPC_TEST_IDENTITY_MISSING"));
    }

    #[test]
    fn test_env_identity_rejects_empty_value() {
        env::set_var("BUSRPC_TEST_IDENTITY_EMPTY", "");
        let result = EnvIdentity::new("BUSRPC_TEST_IDENTITY_EMPTY").resolve();
        assert!(matches!(result, Err(IdentityError::Invalid(_))));
    }

    #[test]
    fn test_process_identity_is_non_empty() {
        let id = ProcessIdentity.resolve().unwrap();
        assert!(!id.as_str().is_empty());
    }

    #[test]
    fn test_fallback_uses_first_success() {
        let fixed = ServiceId::new("fixed").unwrap();
        let resolver = FallbackIdentity::new()
            .or(EnvIdentity::new("BUSRPC_TEST_IDENTITY_NEVER_SET"))
            .or(FixedIdentity::new(fixed.clone()));
        assert_eq!(resolver.resolve().unwrap(), fixed);
    }

    #[test]
    fn test_fallback_exhausted() {
        let resolver = FallbackIdentity::new().or(EnvIdentity::new("BUSRPC_TEST_IDENTITY_NOPE"));
        assert!(matches!(resolver.resolve(), Err(IdentityError::Exhausted)));
    }
}
