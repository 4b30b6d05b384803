//! # Bus RPC Host
//!
//! This crate provides a small host process for the bus RPC layer: it serves
//! a set of built-in methods on a local bus and drives calls against them.
//!
//! ## Philosophy
//!
//! - **Host owns I/O**: Handlers never print; results go to the host's output
//! - **Explicit surface**: Only the built-in tables are served
//! - **Deterministic by default**: Inline bus delivery unless asked otherwise
//!
//! ## Responsibilities
//!
//! The host runtime:
//! - Resolves its own identity and serves under it
//! - Executes `call`/`remote`/`list` commands from arguments or stdin
//! - Stops its serve cycle cleanly on quit or end of input

pub mod builtins;
pub mod commands;
pub mod runtime;

pub use builtins::Calculator;
pub use commands::{HostCommand, HostCommandError, HostCommandParser};
pub use runtime::{CommandOutcome, HostRuntime, HostRuntimeConfig, HostRuntimeError};
