//! Timing configuration for callers and services

use crate::client::CallPolicy;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SERVE_POLL_INTERVAL_MS: u64 = 1_000;

/// RPC timing knobs
///
/// Loaded from JSON with every field optional:
///
/// ```
/// use remote_ipc::RpcConfig;
///
/// let config = RpcConfig::from_json(r#"{"call_timeout_ms": null}"#).unwrap();
/// assert_eq!(config.call_timeout_ms, None);
/// assert_eq!(config.poll_interval_ms, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RpcConfig {
    /// Upper bound of each wait while a call is pending
    pub poll_interval_ms: u64,
    /// Per-call deadline; `None` waits until answered or aborted
    pub call_timeout_ms: Option<u64>,
    /// Upper bound of each wait in the serve loop
    pub serve_poll_interval_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            call_timeout_ms: Some(DEFAULT_CALL_TIMEOUT_MS),
            serve_poll_interval_ms: DEFAULT_SERVE_POLL_INTERVAL_MS,
        }
    }
}

impl RpcConfig {
    /// Parses and validates a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: RpcConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        Self::from_json(&json)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = duration_ms(interval);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout_ms = timeout.map(duration_ms);
        self
    }

    pub fn with_serve_poll_interval(mut self, interval: Duration) -> Self {
        self.serve_poll_interval_ms = duration_ms(interval);
        self
    }

    /// Rejects zero poll intervals, which would spin
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.serve_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "serve_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    pub fn serve_poll_interval(&self) -> Duration {
        Duration::from_millis(self.serve_poll_interval_ms)
    }

    /// The default policy for calls made under this configuration
    pub fn call_policy(&self) -> CallPolicy {
        CallPolicy::new(self.poll_interval(), self.call_timeout())
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
