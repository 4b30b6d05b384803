//! Caller side: correlating responses with outstanding calls
//!
//! Every call mints a fresh correlation token and installs a [`PendingCall`]
//! listener for the duration of the call. Because the bus broadcasts, each
//! pending call sees every response in flight and keeps only the one whose
//! `sender` is its token and whose routing key is the service it called.

use crate::config::RpcConfig;
use crate::error::RpcError;
use crate::target::CallTarget;
use core_types::{CorrelationToken, MethodPath, ServiceId};
use identity::{IdentityError, IdentityResolver};
use ipc::{
    Bus, BusListener, EnvelopeError, ErrorCode, RequestAddress, RequestEnvelope,
    ResponseAddress, ResponseEnvelope,
};
use lifecycle::{CancellationToken, Timeout};
use parking_lot::{Condvar, Mutex};
use serde_json::{Map, Value};
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::{Duration, Instant};

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How long a caller is prepared to wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    /// Upper bound of each wait; the abort signal is checked at every wake
    pub poll_interval: Duration,
    /// Total time allowed for the call; `None` waits until answered or aborted
    pub deadline: Option<Duration>,
}

impl CallPolicy {
    pub fn new(poll_interval: Duration, deadline: Option<Duration>) -> Self {
        Self {
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            deadline,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn without_deadline(mut self) -> Self {
        self.deadline = None;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }
}

impl Default for CallPolicy {
    fn default() -> Self {
        RpcConfig::default().call_policy()
    }
}

enum Slot {
    Waiting,
    Ready(Result<ResponseEnvelope, EnvelopeError>),
    Consumed,
}

/// The listener standing in for one outstanding call
///
/// The first matching response is kept; later ones (duplicates, or answers
/// arriving after the caller gave up) are discarded.
pub struct PendingCall {
    address: ResponseAddress,
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl PendingCall {
    pub fn new(address: ResponseAddress) -> Self {
        Self {
            address,
            slot: Mutex::new(Slot::Waiting),
            ready: Condvar::new(),
        }
    }

    pub fn token(&self) -> &CorrelationToken {
        &self.address.token
    }

    pub fn callee(&self) -> &ServiceId {
        &self.address.callee
    }

    /// Stores a response and wakes the waiter; returns `false` if one was
    /// already recorded or the call is over
    pub fn record(&self, response: Result<ResponseEnvelope, EnvelopeError>) -> bool {
        let mut slot = self.slot.lock();
        match *slot {
            Slot::Waiting => {
                *slot = Slot::Ready(response);
                self.ready.notify_all();
                true
            }
            Slot::Ready(_) | Slot::Consumed => {
                tracing::debug!(token = %self.address.token, "discarding extra response");
                false
            }
        }
    }

    /// Blocks until a response is recorded, `abort` fires, or the policy's
    /// deadline passes, checked in that order at every wake
    pub fn wait(
        &self,
        abort: &CancellationToken,
        policy: &CallPolicy,
    ) -> Result<ResponseEnvelope, RpcError> {
        // A limit too far out to represent behaves like no deadline at all.
        let deadline = policy.deadline.and_then(|limit| {
            Timeout::after(limit)
                .to_deadline(Instant::now())
                .map(|deadline| (limit, deadline))
        });
        let mut slot = self.slot.lock();
        loop {
            if matches!(*slot, Slot::Ready(_)) {
                if let Slot::Ready(response) = mem::replace(&mut *slot, Slot::Consumed) {
                    return response.map_err(RpcError::InvalidResponse);
                }
            }

            if abort.is_cancelled() {
                *slot = Slot::Consumed;
                tracing::debug!(
                    token = %self.address.token,
                    reason = ?abort.reason(),
                    "call aborted"
                );
                return Err(RpcError::Aborted);
            }

            let mut wait = policy.poll_interval;
            if let Some((limit, deadline)) = deadline {
                match deadline.time_remaining(Instant::now()) {
                    Some(remaining) => wait = wait.min(remaining),
                    None => {
                        *slot = Slot::Consumed;
                        tracing::warn!(
                            token = %self.address.token,
                            service = %self.address.callee,
                            "call timed out"
                        );
                        return Err(RpcError::Timeout { after: limit });
                    }
                }
            }

            self.ready.wait_for(&mut slot, wait);
        }
    }
}

impl BusListener for PendingCall {
    fn on_message(&self, sender: &str, topic: &str, payload: &str) {
        if !self.address.matches(sender, topic) {
            return;
        }
        let response = ResponseEnvelope::decode(payload);
        if let Err(err) = &response {
            tracing::warn!(token = %self.address.token, error = %err, "undecodable response");
        }
        self.record(response);
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("token", &self.address.token)
            .field("callee", &self.address.callee)
            .finish()
    }
}

/// Issues calls to remote services over a bus
///
/// Cloning a client is cheap and shares the bus and abort signal.
#[derive(Clone)]
pub struct Client {
    bus: Arc<dyn Bus>,
    abort: CancellationToken,
    policy: CallPolicy,
}

impl Client {
    /// Creates a client with the default policy and no abort signal
    pub fn new<B: Bus + 'static>(bus: B) -> Self {
        Self {
            bus: Arc::new(bus),
            abort: CancellationToken::none(),
            policy: CallPolicy::default(),
        }
    }

    /// Creates a client using the policy derived from `config`
    pub fn with_config<B: Bus + 'static>(bus: B, config: &RpcConfig) -> Self {
        Self::new(bus).with_policy(config.call_policy())
    }

    /// Makes every pending call stop waiting once `abort` fires
    pub fn with_abort(mut self, abort: CancellationToken) -> Self {
        self.abort = abort;
        self
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    /// Root call target for the service `id`
    pub fn target(&self, id: ServiceId) -> CallTarget {
        CallTarget::new(self.clone(), id, self.policy)
    }

    /// Root call target for this process's own identifier
    pub fn local_target(
        &self,
        resolver: &dyn IdentityResolver,
    ) -> Result<CallTarget, IdentityError> {
        Ok(self.target(resolver.resolve()?))
    }

    /// Calls `method_path` on `target` and blocks for the correlated answer
    pub fn call(
        &self,
        target: &ServiceId,
        method_path: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
        policy: &CallPolicy,
    ) -> Result<Value, RpcError> {
        let path = MethodPath::parse(method_path)?;
        let token = CorrelationToken::new();
        let request = RequestEnvelope::new(path.as_str(), positional, named)
            .encode()
            .map_err(RpcError::Encode)?;

        let pending = Arc::new(PendingCall::new(ResponseAddress::new(
            token.clone(),
            target.clone(),
        )));
        // Listen before publishing: an inline bus answers inside `publish`.
        let _subscription = self.bus.subscribe(pending.clone());

        tracing::trace!(service = %target, method = %path, token = %token, "calling");
        RequestAddress::new(target.clone(), token)
            .to_message(request)
            .publish_on(&*self.bus)?;

        let response = pending.wait(&self.abort, policy)?;
        into_result(response, &path)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("policy", &self.policy)
            .field("aborted", &self.abort.is_cancelled())
            .finish()
    }
}

fn into_result(response: ResponseEnvelope, path: &MethodPath) -> Result<Value, RpcError> {
    match response {
        ResponseEnvelope::Result(value) => Ok(value),
        ResponseEnvelope::Error(error) => {
            let (kind, message) = ResponseEnvelope::classify_error(&error);
            match kind {
                ErrorCode::UnknownMethod => Err(RpcError::UnknownMethod {
                    path: path.to_string(),
                    message: message.to_string(),
                }),
                kind => Err(RpcError::Remote {
                    kind,
                    message: message.to_string(),
                }),
            }
        }
    }
}
