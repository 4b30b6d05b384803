//! Request and response envelopes
//!
//! Both envelopes are JSON objects. A request is
//! `{"methodPath": ..., "positionalArgs": [...], "namedArgs": {...}}`;
//! a response is exactly one of `{"result": <value>}` or
//! `{"error": "<code>: <message>"}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

const RESULT_FIELD: &str = "result";
const ERROR_FIELD: &str = "error";

/// Envelope codec errors
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Decode(String),

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A call request: method path plus positional and named arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RequestEnvelope {
    method_path: String,
    positional_args: Vec<Value>,
    named_args: Map<String, Value>,
}

impl RequestEnvelope {
    /// Creates a request envelope
    pub fn new(
        method_path: impl Into<String>,
        positional_args: Vec<Value>,
        named_args: Map<String, Value>,
    ) -> Self {
        Self {
            method_path: method_path.into(),
            positional_args,
            named_args,
        }
    }

    pub fn method_path(&self) -> &str {
        &self.method_path
    }

    pub fn positional_args(&self) -> &[Value] {
        &self.positional_args
    }

    pub fn named_args(&self) -> &Map<String, Value> {
        &self.named_args
    }

    /// Splits the envelope into its parts
    pub fn into_parts(self) -> (String, Vec<Value>, Map<String, Value>) {
        (self.method_path, self.positional_args, self.named_args)
    }

    /// Encodes the envelope as a JSON payload
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a JSON payload, rejecting missing or unknown fields
    pub fn decode(payload: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(payload).map_err(|err| EnvelopeError::Decode(err.to_string()))
    }
}

/// Classification carried at the front of a response's error string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The request payload was not a well-formed request envelope
    DecodeError,
    /// The method path is not registered on the callee
    UnknownMethod,
    /// The handler ran and failed
    HandlerFailure,
    /// An error string without a recognized code
    Unclassified,
}

impl ErrorCode {
    /// Wire spelling of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DecodeError => "decode_error",
            ErrorCode::UnknownMethod => "unknown_method",
            ErrorCode::HandlerFailure => "handler_failure",
            ErrorCode::Unclassified => "unclassified",
        }
    }

    fn from_wire(code: &str) -> Option<Self> {
        match code {
            "decode_error" => Some(ErrorCode::DecodeError),
            "unknown_method" => Some(ErrorCode::UnknownMethod),
            "handler_failure" => Some(ErrorCode::HandlerFailure),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call response: exactly one of a result value or an error description
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseEnvelope {
    Result(Value),
    Error(String),
}

impl ResponseEnvelope {
    /// Creates a success response
    pub fn result(value: Value) -> Self {
        ResponseEnvelope::Result(value)
    }

    /// Creates an error response tagged with `code`
    pub fn failure(code: ErrorCode, message: impl fmt::Display) -> Self {
        ResponseEnvelope::Error(format!("{}: {}", code, message))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ResponseEnvelope::Error(_))
    }

    /// Splits an error string into its code and message
    ///
    /// Strings that do not start with a known code are returned whole as
    /// [`ErrorCode::Unclassified`].
    pub fn classify_error(error: &str) -> (ErrorCode, &str) {
        error
            .split_once(": ")
            .and_then(|(code, message)| ErrorCode::from_wire(code).map(|code| (code, message)))
            .unwrap_or((ErrorCode::Unclassified, error))
    }

    /// Encodes the envelope as a JSON payload
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a JSON payload
    ///
    /// The object must hold exactly one field, `result` (any value) or
    /// `error` (a string).
    pub fn decode(payload: &str) -> Result<Self, EnvelopeError> {
        let value: Value =
            serde_json::from_str(payload).map_err(|err| EnvelopeError::Decode(err.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(EnvelopeError::Decode(
                "response envelope must be a JSON object".to_string(),
            ));
        };
        if object.len() != 1 {
            return Err(EnvelopeError::Decode(format!(
                "response envelope must have exactly one field, found {}",
                object.len()
            )));
        }
        if let Some(result) = object.remove(RESULT_FIELD) {
            return Ok(ResponseEnvelope::Result(result));
        }
        match object.remove(ERROR_FIELD) {
            Some(Value::String(error)) => Ok(ResponseEnvelope::Error(error)),
            Some(other) => Err(EnvelopeError::Decode(format!(
                "response error field must be a string, found {}",
                other
            ))),
            None => Err(EnvelopeError::Decode(format!(
                "unknown response field {:?}",
                object.keys().next().map(String::as_str).unwrap_or_default()
            ))),
        }
    }
}
