//! Handlers and the arguments they receive

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A callable exposed on the bus
pub type Handler = Arc<dyn Fn(Args) -> Result<Value, HandlerError> + Send + Sync>;

/// Wraps a closure returning any serializable value into a [`Handler`]
pub fn handler<F, R>(f: F) -> Handler
where
    F: Fn(Args) -> Result<R, HandlerError> + Send + Sync + 'static,
    R: Serialize,
{
    Arc::new(move |args| {
        let value = f(args)?;
        serde_json::to_value(value).map_err(|err| HandlerError::Encode(err.to_string()))
    })
}

/// Failure raised by a handler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("missing positional argument {index}")]
    MissingArgument { index: usize },

    #[error("missing named argument '{name}'")]
    MissingNamedArgument { name: String },

    #[error("invalid argument {name}: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("cannot encode result: {0}")]
    Encode(String),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    /// Creates a free-form failure
    pub fn failed(message: impl fmt::Display) -> Self {
        HandlerError::Failed(message.to_string())
    }
}

/// Positional and named arguments decoded from a request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    named: Map<String, Value>,
}

impl Args {
    pub fn new(positional: Vec<Value>, named: Map<String, Value>) -> Self {
        Self { positional, named }
    }

    /// Positional arguments only
    pub fn positional_only(positional: Vec<Value>) -> Self {
        Self::new(positional, Map::new())
    }

    pub fn positional_args(&self) -> &[Value] {
        &self.positional
    }

    pub fn named_args(&self) -> &Map<String, Value> {
        &self.named
    }

    /// Number of positional arguments
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }

    /// Decodes the positional argument at `index`
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, HandlerError> {
        let value = self
            .positional
            .get(index)
            .ok_or(HandlerError::MissingArgument { index })?;
        decode(value, || format!("#{}", index))
    }

    /// Decodes the positional argument at `index`, if present
    pub fn opt_arg<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, HandlerError> {
        self.positional
            .get(index)
            .map(|value| decode(value, || format!("#{}", index)))
            .transpose()
    }

    /// Decodes the named argument `name`
    pub fn named<T: DeserializeOwned>(&self, name: &str) -> Result<T, HandlerError> {
        let value = self
            .named
            .get(name)
            .ok_or_else(|| HandlerError::MissingNamedArgument {
                name: name.to_string(),
            })?;
        decode(value, || format!("'{}'", name))
    }

    /// Decodes the named argument `name`, falling back to `default`
    pub fn named_or<T: DeserializeOwned>(
        &self,
        name: &str,
        default: T,
    ) -> Result<T, HandlerError> {
        match self.named.get(name) {
            Some(value) => decode(value, || format!("'{}'", name)),
            None => Ok(default),
        }
    }
}

fn decode<T: DeserializeOwned>(
    value: &Value,
    name: impl FnOnce() -> String,
) -> Result<T, HandlerError> {
    T::deserialize(value).map_err(|err| HandlerError::InvalidArgument {
        name: name(),
        reason: err.to_string(),
    })
}
