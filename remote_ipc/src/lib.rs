//! # Remote IPC
//!
//! Synchronous-looking remote calls layered over a broadcast bus.
//!
//! ## Philosophy
//!
//! - **Correlation, not routing**: The bus delivers everything to everyone.
//!   A fresh token per call is what lets concurrent calls share it without
//!   cross-talk.
//! - **The server never fails the bus**: Every request gets a response value;
//!   malformed input, unknown methods and handler failures (panics included)
//!   all become `error` responses.
//! - **Failures are typed on the caller**: [`RpcError`] tells a remote
//!   failure apart from a missing method, a timeout or an abort.
//!
//! ## Example
//!
//! ```
//! use core_types::ServiceId;
//! use ipc::LocalBus;
//! use lifecycle::{CancellationReason, CancellationSource};
//! use method_registry::{Args, HandlerError, MethodTable};
//! use remote_ipc::{Client, Service};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let bus = LocalBus::new();
//! let id = ServiceId::new("calculator").unwrap();
//! let service = Arc::new(Service::new(id.clone(), bus.clone()));
//! let math = MethodTable::new().method("add", |args: Args| {
//!     Ok::<_, HandlerError>(args.arg::<i64>(0)? + args.arg::<i64>(1)?)
//! });
//!
//! let source = CancellationSource::new();
//! let server = {
//!     let service = service.clone();
//!     let token = source.token();
//!     thread::spawn(move || service.serve(&token, vec![("math".to_string(), math)]))
//! };
//! while !service.live_methods().contains(&"math.add".to_string()) {
//!     thread::yield_now();
//! }
//!
//! let client = Client::new(bus);
//! let sum: i64 = client
//!     .target(id)
//!     .path("math")
//!     .path("add")
//!     .call_as(vec![2.into(), 3.into()])
//!     .unwrap();
//! assert_eq!(sum, 5);
//!
//! source.cancel(CancellationReason::Shutdown);
//! server.join().unwrap().unwrap();
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod target;

pub use client::{CallPolicy, Client, PendingCall};
pub use config::RpcConfig;
pub use error::{ConfigError, RpcError, ServeError};
pub use server::{Dispatcher, Service};
pub use target::CallTarget;
