//! Service side: dispatching requests to registered handlers
//!
//! A [`Dispatcher`] turns one request payload into one response payload and
//! never fails: every problem becomes an `error` response. A [`Service`]
//! owns a dispatcher subscribed to the bus, the methods it declares, and the
//! serve loop that exposes them.

use crate::config::RpcConfig;
use crate::error::ServeError;
use core_types::ServiceId;
use identity::IdentityResolver;
use ipc::{
    Bus, BusListener, ErrorCode, RequestAddress, RequestEnvelope, ResponseEnvelope, Subscription,
};
use lifecycle::CancellationToken;
use method_registry::{Args, Handler, MethodRegistry, MethodSet, MethodTable};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Sent if a response cannot be encoded; kept literal so it cannot fail
const ENCODE_FAILURE_RESPONSE: &str =
    r#"{"error":"handler_failure: response could not be encoded"}"#;

/// Answers requests addressed to one service identifier
pub struct Dispatcher {
    id: ServiceId,
    registry: Arc<RwLock<MethodRegistry>>,
    bus: Arc<dyn Bus>,
}

impl Dispatcher {
    pub fn new(id: ServiceId, registry: Arc<RwLock<MethodRegistry>>, bus: Arc<dyn Bus>) -> Self {
        Self { id, registry, bus }
    }

    /// Dispatcher over a fixed registry that nothing else shares
    pub fn with_registry<B: Bus + 'static>(
        id: ServiceId,
        registry: MethodRegistry,
        bus: B,
    ) -> Self {
        Self::new(id, Arc::new(RwLock::new(registry)), Arc::new(bus))
    }

    pub fn id(&self) -> &ServiceId {
        &self.id
    }

    /// Decodes, looks up, invokes and encodes; never panics
    pub fn dispatch(&self, payload: &str) -> String {
        self.respond(payload)
            .encode()
            .unwrap_or_else(|err| {
                tracing::error!(service = %self.id, error = %err, "failed to encode response");
                ENCODE_FAILURE_RESPONSE.to_string()
            })
    }

    fn respond(&self, payload: &str) -> ResponseEnvelope {
        let request = match RequestEnvelope::decode(payload) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(service = %self.id, error = %err, "rejecting malformed request");
                return ResponseEnvelope::failure(ErrorCode::DecodeError, err);
            }
        };
        let (path, positional, named) = request.into_parts();

        // Clone the handler out so the registry is unlocked while it runs.
        let lookup = self.registry.read().lookup(&path);
        let handler = match lookup {
            Ok(handler) => handler,
            Err(err) => {
                tracing::warn!(service = %self.id, method = %path, error = %err, "unknown method");
                return ResponseEnvelope::failure(ErrorCode::UnknownMethod, err);
            }
        };

        match invoke(&handler, Args::new(positional, named)) {
            Ok(value) => ResponseEnvelope::result(value),
            Err(description) => {
                tracing::error!(
                    service = %self.id,
                    method = %path,
                    error = %description,
                    "handler failed"
                );
                ResponseEnvelope::failure(ErrorCode::HandlerFailure, description)
            }
        }
    }
}

impl BusListener for Dispatcher {
    fn on_message(&self, sender: &str, topic: &str, payload: &str) {
        if sender != self.id.as_str() {
            return;
        }
        let address = match RequestAddress::parse(sender, topic) {
            Ok(address) => address,
            Err(err) => {
                tracing::warn!(
                    service = %self.id,
                    topic,
                    error = %err,
                    "ignoring unroutable request"
                );
                return;
            }
        };

        let response = self.dispatch(payload);
        if let Err(err) = address
            .reply_address()
            .to_message(response)
            .publish_on(&*self.bus)
        {
            tracing::warn!(
                service = %self.id,
                token = %address.token,
                error = %err,
                "failed to publish response"
            );
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher").field("id", &self.id).finish()
    }
}

fn invoke(handler: &Handler, args: Args) -> Result<serde_json::Value, String> {
    match panic::catch_unwind(AssertUnwindSafe(|| handler(args))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.to_string()),
        Err(payload) => Err(format!("handler panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

struct ServiceInner {
    id: ServiceId,
    config: RpcConfig,
    declared: Mutex<MethodRegistry>,
    live: Arc<RwLock<MethodRegistry>>,
    // Held by the running serve call
    claimed: AtomicBool,
    // Set once the live registry is populated; guarded by `declared`
    serving: AtomicBool,
}

/// Clears the live registry when a serve cycle ends, including by unwind
struct ServeGuard<'a> {
    inner: &'a ServiceInner,
}

impl Drop for ServeGuard<'_> {
    fn drop(&mut self) {
        let _declared = self.inner.declared.lock();
        self.inner.live.write().clear();
        self.inner.serving.store(false, Ordering::Release);
        self.inner.claimed.store(false, Ordering::Release);
    }
}

/// A named participant that exposes methods on the bus
///
/// The dispatcher stays subscribed for as long as the `Service` exists, so a
/// request arriving between serve cycles is answered with `unknown_method`
/// rather than left to time out.
pub struct Service {
    inner: Arc<ServiceInner>,
    _subscription: Subscription,
}

impl Service {
    /// Creates a service with the default configuration
    pub fn new<B: Bus + 'static>(id: ServiceId, bus: B) -> Self {
        Self::with_config(id, bus, RpcConfig::default())
    }

    pub fn with_config<B: Bus + 'static>(id: ServiceId, bus: B, config: RpcConfig) -> Self {
        let bus: Arc<dyn Bus> = Arc::new(bus);
        let live = Arc::new(RwLock::new(MethodRegistry::new()));
        let dispatcher = Arc::new(Dispatcher::new(id.clone(), live.clone(), bus.clone()));
        let subscription = bus.subscribe(dispatcher);
        tracing::debug!(service = %id, "dispatcher subscribed");

        Self {
            inner: Arc::new(ServiceInner {
                id,
                config,
                declared: Mutex::new(MethodRegistry::new()),
                live,
                claimed: AtomicBool::new(false),
                serving: AtomicBool::new(false),
            }),
            _subscription: subscription,
        }
    }

    /// Creates a service named by `resolver`
    pub fn from_resolver<B: Bus + 'static>(
        resolver: &dyn IdentityResolver,
        bus: B,
        config: RpcConfig,
    ) -> Result<Self, ServeError> {
        Ok(Self::with_config(resolver.resolve()?, bus, config))
    }

    pub fn id(&self) -> &ServiceId {
        &self.inner.id
    }

    pub fn config(&self) -> &RpcConfig {
        &self.inner.config
    }

    /// Whether a serve cycle has installed its methods and not yet stopped
    pub fn is_serving(&self) -> bool {
        self.inner.serving.load(Ordering::Acquire)
    }

    /// Declares a method; it is installed live too if a cycle is running
    pub fn register(&self, name: &str, handler: Handler) -> Result<(), ServeError> {
        let mut declared = self.inner.declared.lock();
        declared.register(name, handler.clone())?;
        if self.is_serving() {
            self.inner.live.write().register(name, handler)?;
        }
        Ok(())
    }

    /// Declares every entry of `table` under `prefix`
    pub fn register_namespace(
        &self,
        prefix: &str,
        table: MethodTable,
    ) -> Result<usize, ServeError> {
        let mut declared = self.inner.declared.lock();
        let count = declared.register_namespace(prefix, table.clone())?;
        if self.is_serving() {
            self.inner.live.write().register_namespace(prefix, table)?;
        }
        Ok(count)
    }

    /// Declares every entry of `table` at the top level
    pub fn register_table(&self, table: MethodTable) -> Result<usize, ServeError> {
        let mut declared = self.inner.declared.lock();
        let count = declared.register_table(table.clone())?;
        if self.is_serving() {
            self.inner.live.write().register_table(table)?;
        }
        Ok(count)
    }

    /// Declares the methods of a [`MethodSet`] under `prefix`
    pub fn register_set<S: MethodSet>(
        &self,
        prefix: &str,
        set: Arc<S>,
    ) -> Result<usize, ServeError> {
        self.register_namespace(prefix, MethodTable::from_set(set))
    }

    /// Paths callable right now, sorted
    pub fn live_methods(&self) -> Vec<String> {
        self.inner.live.read().names()
    }

    /// Paths declared for every serve cycle, sorted
    pub fn declared_methods(&self) -> Vec<String> {
        self.inner.declared.lock().names()
    }

    /// Exposes the declared methods plus `namespaces` until `shutdown` fires
    ///
    /// The live registry is cleared again before this returns.
    pub fn serve(
        &self,
        shutdown: &CancellationToken,
        namespaces: Vec<(String, MethodTable)>,
    ) -> Result<(), ServeError> {
        if self
            .inner
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ServeError::AlreadyServing);
        }
        let _guard = ServeGuard { inner: &self.inner };

        let count = {
            let declared = self.inner.declared.lock();
            let mut live = declared.clone();
            for (prefix, table) in namespaces {
                live.register_namespace(&prefix, table)?;
            }
            let count = live.len();
            *self.inner.live.write() = live;
            self.inner.serving.store(true, Ordering::Release);
            count
        };
        tracing::info!(service = %self.inner.id, methods = count, "serving");

        let tick = self.inner.config.serve_poll_interval();
        while !shutdown.wait_for_cancellation(tick) {}

        tracing::info!(
            service = %self.inner.id,
            reason = ?shutdown.reason(),
            "stopped serving"
        );
        Ok(())
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.inner.id)
            .field("serving", &self.is_serving())
            .field("live", &self.live_methods())
            .finish()
    }
}
