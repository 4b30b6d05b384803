//! Explicit method tables
//!
//! A [`MethodTable`] is the opt-in list of what a service exposes. Nothing is
//! callable unless it has been put in a table or registered by name.

use crate::handler::{handler, Args, Handler, HandlerError};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// An ordered list of `(name, handler)` entries
#[derive(Clone, Default)]
pub struct MethodTable {
    entries: Vec<(String, Handler)>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table exposed by a [`MethodSet`]
    pub fn from_set<S: MethodSet>(set: Arc<S>) -> Self {
        set.method_table()
    }

    /// Adds a method backed by a closure returning any serializable value
    pub fn method<F, R>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Args) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Serialize,
    {
        self.handler(name, handler(f))
    }

    /// Adds an already-built handler
    pub fn handler(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.insert(name, handler);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, handler: Handler) {
        self.entries.push((name.into(), handler));
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Handler)> {
        self.entries.iter().map(|(name, handler)| (name.as_str(), handler))
    }
}

impl IntoIterator for MethodTable {
    type Item = (String, Handler);
    type IntoIter = std::vec::IntoIter<(String, Handler)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// A type that exposes a set of methods
///
/// Implementors list their callable methods explicitly; handlers typically
/// capture a clone of the `Arc` so they outlive the call site.
///
/// ```
/// use method_registry::{Args, HandlerError, MethodSet, MethodTable};
/// use std::sync::Arc;
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// impl MethodSet for Greeter {
///     fn method_table(self: Arc<Self>) -> MethodTable {
///         MethodTable::new().method("greet", move |args: Args| {
///             let name: String = args.arg(0)?;
///             Ok::<_, HandlerError>(format!("{}, {}", self.greeting, name))
///         })
///     }
/// }
///
/// let table = MethodTable::from_set(Arc::new(Greeter { greeting: "hi".into() }));
/// assert_eq!(table.names().collect::<Vec<_>>(), vec!["greet"]);
/// ```
pub trait MethodSet: Send + Sync + 'static {
    fn method_table(self: Arc<Self>) -> MethodTable;
}
