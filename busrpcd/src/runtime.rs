//! # Host Runtime
//!
//! Owns the bus, the host's service and its serve thread, and executes
//! [`HostCommand`]s against them.

use crate::builtins::{self, Calculator};
use crate::commands::{HostCommand, HostCommandError, HostCommandParser};
use core_types::ServiceId;
use identity::FallbackIdentity;
use ipc::{DeliveryMode, LocalBus};
use lifecycle::{CancellationReason, CancellationSource};
use remote_ipc::{Client, ConfigError, RpcConfig, RpcError, ServeError, Service};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostRuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Serve(#[from] ServeError),

    #[error("Command error: {0}")]
    Command(#[from] HostCommandError),

    #[error("Call failed: {0}")]
    Call(#[from] RpcError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serve thread panicked")]
    ServeThreadPanicked,

    #[error("Service stopped before it started serving")]
    NotServing,

    #[error("{0} command(s) failed")]
    CommandsFailed(usize),
}

/// Host runtime configuration
#[derive(Debug, Clone, Default)]
pub struct HostRuntimeConfig {
    /// Identifier to serve under; resolved from the environment when `None`
    pub service_id: Option<ServiceId>,
    /// Timing for calls and the serve loop
    pub rpc: RpcConfig,
    /// How the bus delivers messages
    pub delivery: DeliveryMode,
    /// Commands to run instead of reading stdin
    pub commands: Vec<String>,
}

/// What a successfully executed command produced
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Value(Value),
    Quit,
}

/// Host runtime
pub struct HostRuntime {
    config: HostRuntimeConfig,
    bus: LocalBus,
    service: Arc<Service>,
    calculator: Arc<Calculator>,
    client: Client,
    shutdown: CancellationSource,
    serve_thread: Option<JoinHandle<Result<(), ServeError>>>,
}

impl HostRuntime {
    /// Creates the bus and service and starts serving
    pub fn new(config: HostRuntimeConfig) -> Result<Self, HostRuntimeError> {
        config.rpc.validate()?;

        let bus = LocalBus::with_mode(config.delivery);
        let service = Arc::new(match &config.service_id {
            Some(id) => Service::with_config(id.clone(), bus.clone(), config.rpc.clone()),
            None => Service::from_resolver(
                &FallbackIdentity::standard(),
                bus.clone(),
                config.rpc.clone(),
            )?,
        });

        let calculator = Arc::new(Calculator::new());
        let declared = builtins::install(&service, calculator.clone())?;
        tracing::debug!(service = %service.id(), methods = declared, "built-ins declared");

        let shutdown = CancellationSource::new();
        let serve_thread = {
            let service = service.clone();
            let token = shutdown.token();
            thread::spawn(move || service.serve(&token, Vec::new()))
        };

        let client = Client::with_config(bus.clone(), &config.rpc);
        let mut runtime = Self {
            config,
            bus,
            service,
            calculator,
            client,
            shutdown,
            serve_thread: Some(serve_thread),
        };
        runtime.wait_until_serving()?;

        tracing::info!(
            service = %runtime.service.id(),
            mode = ?runtime.bus.mode(),
            "host started"
        );
        Ok(runtime)
    }

    fn wait_until_serving(&mut self) -> Result<(), HostRuntimeError> {
        while !self.service.is_serving() {
            let finished = self
                .serve_thread
                .as_ref()
                .map_or(true, |handle| handle.is_finished());
            if finished {
                self.join_serve_thread()?;
                return Err(HostRuntimeError::NotServing);
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    pub fn service(&self) -> &Arc<Service> {
        &self.service
    }

    pub fn calculator(&self) -> &Calculator {
        &self.calculator
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn bus(&self) -> &LocalBus {
        &self.bus
    }

    /// Executes a parsed command
    pub fn execute(&self, command: HostCommand) -> Result<CommandOutcome, HostRuntimeError> {
        match command {
            HostCommand::Call {
                service,
                path,
                positional,
                named,
            } => {
                let target = service.unwrap_or_else(|| self.service.id().clone());
                tracing::debug!(service = %target, method = %path.as_str(), "calling");
                let value = self.client.call(
                    &target,
                    path.as_str(),
                    positional,
                    named,
                    self.client.policy(),
                )?;
                Ok(CommandOutcome::Value(value))
            }
            HostCommand::List => Ok(CommandOutcome::Value(Value::from(
                self.service.live_methods(),
            ))),
            HostCommand::Quit => Ok(CommandOutcome::Quit),
        }
    }

    /// Parses and executes one command line
    pub fn execute_line(&self, line: &str) -> Result<CommandOutcome, HostRuntimeError> {
        self.execute(HostCommandParser::parse(line)?)
    }

    /// Runs the configured commands, or every line of `input` when none are
    /// configured, writing one result per line to `output`
    ///
    /// Failures are reported on `output` and counted; the run continues.
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
    ) -> Result<(), HostRuntimeError> {
        let failures = if self.config.commands.is_empty() {
            self.run_lines(input.lines(), &mut output)?
        } else {
            let commands = self.config.commands.clone();
            self.run_lines(commands.into_iter().map(Ok), &mut output)?
        };
        output.flush()?;

        if failures > 0 {
            return Err(HostRuntimeError::CommandsFailed(failures));
        }
        Ok(())
    }

    fn run_lines<I, W>(&self, lines: I, output: &mut W) -> Result<usize, HostRuntimeError>
    where
        I: Iterator<Item = io::Result<String>>,
        W: Write,
    {
        let mut failures = 0;
        for line in lines {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match self.execute_line(line) {
                Ok(CommandOutcome::Value(value)) => writeln!(output, "{}", value)?,
                Ok(CommandOutcome::Quit) => break,
                Err(err) => {
                    tracing::warn!(command = line, error = %err, "command failed");
                    writeln!(output, "error: {}", err)?;
                    failures += 1;
                }
            }
        }
        Ok(failures)
    }

    /// Stops serving and waits for the serve thread
    pub fn shutdown(&mut self) -> Result<(), HostRuntimeError> {
        self.shutdown.cancel(CancellationReason::Shutdown);
        self.join_serve_thread()
    }

    fn join_serve_thread(&mut self) -> Result<(), HostRuntimeError> {
        match self.serve_thread.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| HostRuntimeError::ServeThreadPanicked)?
                .map_err(HostRuntimeError::from),
            None => Ok(()),
        }
    }
}

impl Drop for HostRuntime {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "host shutdown failed");
        }
    }
}
