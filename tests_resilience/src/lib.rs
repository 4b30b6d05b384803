//! Resilience Test Utilities
//!
//! This crate provides shared utilities for end-to-end RPC tests.
//!
//! ## Test Philosophy
//!
//! - **No cross-talk**: Concurrent calls on one bus only ever see their own
//!   responses
//! - **Bounded waits**: Every call ends, by answer, timeout or abort
//! - **Honest lifecycle**: A stopped service reports unknown methods instead
//!   of silently answering
//! - **Both delivery modes**: Scenarios run with inline and background bus
//!   delivery

use core_types::ServiceId;
use ipc::{DeliveryMode, LocalBus};
use lifecycle::{CancellationReason, CancellationSource};
use method_registry::{Args, HandlerError, MethodTable};
use remote_ipc::{CallPolicy, Client, RpcConfig, ServeError, Service};
use serde_json::Value;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Every bus delivery mode scenarios should pass under
pub const DELIVERY_MODES: [DeliveryMode; 2] = [DeliveryMode::Inline, DeliveryMode::Background];

/// Timing suited to tests: short ticks, a few seconds before giving up
pub fn test_config() -> RpcConfig {
    RpcConfig::default()
        .with_poll_interval(Duration::from_millis(5))
        .with_call_timeout(Some(Duration::from_secs(5)))
        .with_serve_poll_interval(Duration::from_millis(5))
}

/// A short-deadline policy for calls expected to time out
pub fn short_policy(deadline: Duration) -> CallPolicy {
    test_config().call_policy().with_deadline(deadline)
}

/// Builds a service identifier, panicking on invalid input
pub fn service_id(id: &str) -> ServiceId {
    ServiceId::new(id).expect("invalid service id")
}

/// A client on `bus` using [`test_config`]
pub fn test_client(bus: &LocalBus) -> Client {
    Client::with_config(bus.clone(), &test_config())
}

/// Polls `condition` until it holds or five seconds pass
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let started = Instant::now();
    while started.elapsed() < Duration::from_secs(5) {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Calculator methods used across scenarios
///
/// - `add(a, b)`, `sub(a, b)`, `mul(a, b)`
/// - `div(a, b)` fails with "division by zero"
/// - `echo(..)` returns its positional arguments as an array
/// - `scale(x, factor=1)` multiplies by a named factor
/// - `sleep(ms)` blocks, then returns `ms`
/// - `explode()` panics
pub fn calculator_table() -> MethodTable {
    MethodTable::new()
        .method("add", |args: Args| {
            Ok::<_, HandlerError>(args.arg::<i64>(0)? + args.arg::<i64>(1)?)
        })
        .method("sub", |args: Args| {
            Ok::<_, HandlerError>(args.arg::<i64>(0)? - args.arg::<i64>(1)?)
        })
        .method("mul", |args: Args| {
            Ok::<_, HandlerError>(args.arg::<i64>(0)? * args.arg::<i64>(1)?)
        })
        .method("div", |args: Args| {
            let divisor: i64 = args.arg(1)?;
            if divisor == 0 {
                return Err(HandlerError::failed("division by zero"));
            }
            Ok(args.arg::<i64>(0)? / divisor)
        })
        .method("echo", |args: Args| {
            Ok::<_, HandlerError>(Value::Array(args.positional_args().to_vec()))
        })
        .method("scale", |args: Args| {
            let factor: i64 = args.named_or("factor", 1)?;
            Ok::<_, HandlerError>(args.arg::<i64>(0)? * factor)
        })
        .method("sleep", |args: Args| {
            let millis: u64 = args.arg(0)?;
            thread::sleep(Duration::from_millis(millis));
            Ok::<_, HandlerError>(millis)
        })
        .method("explode", |_args: Args| -> Result<Value, HandlerError> {
            panic!("calculator exploded")
        })
}

/// A service running its serve loop on a background thread
pub struct TestNode {
    service: Arc<Service>,
    source: CancellationSource,
    handle: Option<JoinHandle<Result<(), ServeError>>>,
}

impl TestNode {
    /// Creates a service on `bus` and starts serving `namespaces`
    pub fn start(bus: &LocalBus, id: &str, namespaces: Vec<(String, MethodTable)>) -> Self {
        let service = Service::with_config(service_id(id), bus.clone(), test_config());
        Self::serve(Arc::new(service), namespaces)
    }

    /// Starts a serve cycle for an existing service
    ///
    /// Returns once the service's methods are live.
    pub fn serve(service: Arc<Service>, namespaces: Vec<(String, MethodTable)>) -> Self {
        let source = CancellationSource::new();
        let handle = {
            let service = service.clone();
            let token = source.token();
            thread::spawn(move || service.serve(&token, namespaces))
        };
        let node = Self {
            service,
            source,
            handle: Some(handle),
        };
        // A serve call that failed up front has finished instead.
        let started = wait_until(|| {
            node.service.is_serving() || node.handle.as_ref().map_or(true, JoinHandle::is_finished)
        });
        assert!(started, "service never started");
        node
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    pub fn id(&self) -> &ServiceId {
        self.service.id()
    }

    /// Fires the shutdown signal and waits for the serve loop to return
    pub fn stop(&mut self) -> Result<(), ServeError> {
        self.source.cancel(CancellationReason::Shutdown);
        match self.handle.take() {
            Some(handle) => handle.join().expect("serve thread panicked"),
            None => Ok(()),
        }
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.source.cancel(CancellationReason::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Calculator service serving `calculator_table()` both at the top level
/// and under `math`
pub fn calculator_node(bus: &LocalBus, id: &str) -> TestNode {
    let service = Service::with_config(service_id(id), bus.clone(), test_config());
    service
        .register_table(calculator_table())
        .expect("calculator table is valid");
    TestNode::serve(
        Arc::new(service),
        vec![("math".to_string(), calculator_table())],
    )
}
