//! # Method Registry
//!
//! This crate holds the set of methods a service exposes to remote callers.
//!
//! ## Philosophy
//!
//! - **Explicit exposure**: Only names that were registered are callable.
//!   There is no discovery; the registry's `names()` is the full attack
//!   surface.
//! - **Reserved names stay private**: Any path segment starting with `_` is
//!   refused at registration time.
//! - **All or nothing**: A namespace is either registered completely or not
//!   at all.
//!
//! ## Example
//!
//! ```
//! use method_registry::{Args, HandlerError, MethodRegistry, MethodTable};
//!
//! let mut registry = MethodRegistry::new();
//! let math = MethodTable::new().method("add", |args: Args| {
//!     Ok::<_, HandlerError>(args.arg::<i64>(0)? + args.arg::<i64>(1)?)
//! });
//! registry.register_namespace("math", math).unwrap();
//!
//! assert!(registry.contains("math.add"));
//! assert_eq!(registry.names(), vec!["math.add".to_string()]);
//! ```

pub mod handler;
pub mod table;

pub use handler::{handler, Args, Handler, HandlerError};
pub use table::{MethodSet, MethodTable};

use core_types::{MethodPath, PathError, PATH_SEPARATOR};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Prefix marking a path segment as private
pub const RESERVED_PREFIX: char = '_';

/// Error types for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("method name must not be empty")]
    EmptyName,

    #[error("method name {0:?} uses the reserved prefix '_'")]
    ReservedName(String),

    #[error("invalid method name {name:?}: {reason}")]
    InvalidName { name: String, reason: PathError },

    #[error("no method '{0}'")]
    UnknownMethod(String),
}

/// Validates a name for registration and returns it as a path
pub fn validate_name(name: &str) -> Result<MethodPath, RegistryError> {
    let path = MethodPath::parse(name).map_err(|reason| match reason {
        PathError::Empty => RegistryError::EmptyName,
        reason => RegistryError::InvalidName {
            name: name.to_string(),
            reason,
        },
    })?;
    if path
        .segments()
        .any(|segment| segment.starts_with(RESERVED_PREFIX))
    {
        return Err(RegistryError::ReservedName(name.to_string()));
    }
    Ok(path)
}

/// Method registry
///
/// Maps full dotted paths to handlers. Registering an existing name replaces
/// the earlier handler.
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, Handler>,
}

impl MethodRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a single method
    pub fn register(&mut self, name: &str, handler: Handler) -> Result<(), RegistryError> {
        let path = validate_name(name)?;
        self.insert(path, handler);
        Ok(())
    }

    /// Registers every entry of `table` under `prefix`
    ///
    /// Returns the number of methods installed. Nothing is installed if any
    /// resulting name is invalid.
    pub fn register_namespace(
        &mut self,
        prefix: &str,
        table: MethodTable,
    ) -> Result<usize, RegistryError> {
        validate_name(prefix)?;
        let entries = table
            .into_iter()
            .map(|(name, handler)| {
                let full = format!("{}{}{}", prefix, PATH_SEPARATOR, name);
                validate_name(&full).map(|path| (path, handler))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let count = entries.len();
        for (path, handler) in entries {
            self.insert(path, handler);
        }
        Ok(count)
    }

    /// Registers every entry of `table` at the top level, all or nothing
    pub fn register_table(&mut self, table: MethodTable) -> Result<usize, RegistryError> {
        let entries = table
            .into_iter()
            .map(|(name, handler)| validate_name(&name).map(|path| (path, handler)))
            .collect::<Result<Vec<_>, _>>()?;

        let count = entries.len();
        for (path, handler) in entries {
            self.insert(path, handler);
        }
        Ok(count)
    }

    /// Looks up the handler for a full path
    pub fn lookup(&self, path: &str) -> Result<Handler, RegistryError> {
        self.methods
            .get(path)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownMethod(path.to_string()))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.methods.contains_key(path)
    }

    /// Returns every registered path, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Removes every method
    pub fn clear(&mut self) {
        self.methods.clear();
    }

    fn insert(&mut self, path: MethodPath, handler: Handler) {
        let name = String::from(path);
        if self.methods.insert(name.clone(), handler).is_some() {
            tracing::debug!(method = %name, "method handler replaced");
        }
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(value: i64) -> Handler {
        handler(move |_args: Args| Ok::<_, HandlerError>(value))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = MethodRegistry::new();
        registry.register("add", constant(5)).unwrap();

        let handler = registry.lookup("add").unwrap();
        assert_eq!(handler(Args::default()).unwrap(), json!(5));
        assert!(registry.contains("add"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = MethodRegistry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.lookup("missing"),
            Err(RegistryError::UnknownMethod(path)) if path == "missing"
        ));
    }

    #[test]
    fn test_later_registration_overwrites() {
        let mut registry = MethodRegistry::new();
        registry.register("value", constant(1)).unwrap();
        registry.register("value", constant(2)).unwrap();

        assert_eq!(registry.len(), 1);
        let handler = registry.lookup("value").unwrap();
        assert_eq!(handler(Args::default()).unwrap(), json!(2));
    }

    #[test]
    fn test_rejects_bad_names() {
        let mut registry = MethodRegistry::new();
        assert_eq!(
            registry.register("", constant(0)),
            Err(RegistryError::EmptyName)
        );
        assert_eq!(
            registry.register("_secret", constant(0)),
            Err(RegistryError::ReservedName("_secret".to_string()))
        );
        assert_eq!(
            registry.register("math._private", constant(0)),
            Err(RegistryError::ReservedName("math._private".to_string()))
        );
        assert!(matches!(
            registry.register("math..add", constant(0)),
            Err(RegistryError::InvalidName { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_namespace_prefixes_names() {
        let mut registry = MethodRegistry::new();
        let table = MethodTable::new()
            .handler("add", constant(1))
            .handler("sub", constant(2));

        assert_eq!(registry.register_namespace("math", table).unwrap(), 2);
        assert_eq!(
            registry.names(),
            vec!["math.add".to_string(), "math.sub".to_string()]
        );
        assert!(!registry.contains("add"));
    }

    #[test]
    fn test_register_namespace_is_all_or_nothing() {
        let mut registry = MethodRegistry::new();
        let table = MethodTable::new()
            .handler("add", constant(1))
            .handler("_hidden", constant(2));

        assert_eq!(
            registry.register_namespace("math", table),
            Err(RegistryError::ReservedName("math._hidden".to_string()))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_namespace_rejects_reserved_prefix() {
        let mut registry = MethodRegistry::new();
        let table = MethodTable::new().handler("add", constant(1));
        assert_eq!(
            registry.register_namespace("_internal", table),
            Err(RegistryError::ReservedName("_internal".to_string()))
        );
    }

    #[test]
    fn test_register_table_at_top_level() {
        let mut registry = MethodRegistry::new();
        let table = MethodTable::new()
            .handler("ping", constant(1))
            .handler("pong", constant(2));
        assert_eq!(registry.register_table(table).unwrap(), 2);
        assert_eq!(registry.names(), vec!["ping".to_string(), "pong".to_string()]);
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = MethodRegistry::new();
        for name in ["zeta", "alpha", "math.add"] {
            registry.register(name, constant(0)).unwrap();
        }
        assert_eq!(registry.names(), vec!["alpha", "math.add", "zeta"]);
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut registry = MethodRegistry::new();
        registry.register("a", constant(1)).unwrap();
        registry.register("b.c", constant(2)).unwrap();
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert!(!registry.contains("a"));
    }
}
