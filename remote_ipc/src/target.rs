//! Path-building call targets
//!
//! ```no_run
//! use core_types::ServiceId;
//! use ipc::LocalBus;
//! use remote_ipc::Client;
//! use serde_json::json;
//!
//! let client = Client::new(LocalBus::new());
//! let calculator = client.target(ServiceId::new("calculator").unwrap());
//! let sum: i64 = calculator.path("math").path("add").call_as(vec![json!(2), json!(3)]).unwrap();
//! ```

use crate::client::{CallPolicy, Client};
use crate::error::RpcError;
use core_types::{ServiceId, PATH_SEPARATOR};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// An immutable handle naming a method on a remote service
///
/// Extending the path returns a new target; nothing is sent until one of the
/// `call*` methods runs.
#[derive(Clone)]
pub struct CallTarget {
    client: Client,
    target: ServiceId,
    segments: Vec<String>,
    policy: CallPolicy,
}

impl CallTarget {
    pub(crate) fn new(client: Client, target: ServiceId, policy: CallPolicy) -> Self {
        Self {
            client,
            target,
            segments: Vec::new(),
            policy,
        }
    }

    pub fn target(&self) -> &ServiceId {
        &self.target
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    /// The dotted method path accumulated so far
    pub fn method_path(&self) -> String {
        self.segments.join(&PATH_SEPARATOR.to_string())
    }

    /// Extends the path by one segment
    pub fn path(&self, segment: &str) -> CallTarget {
        let mut next = self.clone();
        next.segments.push(segment.to_string());
        next
    }

    /// Same target with a different per-call deadline
    pub fn with_timeout(&self, timeout: Duration) -> CallTarget {
        let mut next = self.clone();
        next.policy = next.policy.with_deadline(timeout);
        next
    }

    /// Same target, waiting until answered or aborted
    pub fn without_deadline(&self) -> CallTarget {
        let mut next = self.clone();
        next.policy = next.policy.without_deadline();
        next
    }

    /// Invokes the method with positional arguments
    pub fn call(&self, positional: Vec<Value>) -> Result<Value, RpcError> {
        self.call_with(positional, Map::new())
    }

    /// Invokes the method with positional and named arguments
    pub fn call_with(
        &self,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<Value, RpcError> {
        self.client.call(
            &self.target,
            &self.method_path(),
            positional,
            named,
            &self.policy,
        )
    }

    /// Invokes the method and deserializes its result
    pub fn call_as<T: DeserializeOwned>(&self, positional: Vec<Value>) -> Result<T, RpcError> {
        let value = self.call(positional)?;
        serde_json::from_value(value).map_err(RpcError::UnexpectedResult)
    }
}

impl fmt::Debug for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallTarget")
            .field("target", &self.target)
            .field("path", &self.method_path())
            .field("policy", &self.policy)
            .finish()
    }
}
