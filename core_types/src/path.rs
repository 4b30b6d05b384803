//! Dotted method paths

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Separator between method path segments (and between topic namespace and
/// routing key)
pub const PATH_SEPARATOR: char = '.';

/// Errors produced when building a method path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("method path must not be empty")]
    Empty,

    #[error("method path {0:?} contains an empty segment")]
    EmptySegment(String),

    #[error("method path {0:?} contains whitespace")]
    Whitespace(String),
}

/// A dotted method path such as `add` or `math.add`
///
/// Every segment is non-empty; the path never starts or ends with a
/// separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodPath(String);

impl MethodPath {
    /// Parses and validates a dotted path
    pub fn parse(path: impl Into<String>) -> Result<Self, PathError> {
        let path = path.into();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        if path.chars().any(char::is_whitespace) {
            return Err(PathError::Whitespace(path));
        }
        if path.split(PATH_SEPARATOR).any(str::is_empty) {
            return Err(PathError::EmptySegment(path));
        }
        Ok(Self(path))
    }

    /// Builds a path from individual segments
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(&PATH_SEPARATOR.to_string());
        Self::parse(joined)
    }

    /// Returns a new path with `child` appended under this one
    pub fn join(&self, child: &str) -> Result<Self, PathError> {
        Self::parse(format!("{}{}{}", self.0, PATH_SEPARATOR, child))
    }

    /// Iterates over the path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_SEPARATOR)
    }

    /// Returns the path as sent on the wire
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MethodPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MethodPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<MethodPath> for String {
    fn from(path: MethodPath) -> Self {
        path.0
    }
}
