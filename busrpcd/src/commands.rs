//! # Host Commands
//!
//! A minimal command surface for driving calls from the command line or stdin.
//!
//! ## Command Set
//!
//! - `call <path> [arg...]` - Call a method on the host's own service
//! - `remote <service> <path> [arg...]` - Call a method on another service
//! - `list` - List the methods the host is serving
//! - `quit` - Stop the host
//!
//! ## Arguments
//!
//! Each argument is read as JSON (`2`, `true`, `"text"`, `[1,2]`). A word that
//! is not valid JSON is taken as a plain string. `name=value` makes a named
//! argument.

use core_types::{IdError, MethodPath, PathError, ServiceId};
use serde_json::{Map, Value};
use thiserror::Error;

/// Host command error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostCommandError {
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Invalid method path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Invalid service ID: {0}")]
    InvalidServiceId(#[from] IdError),

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Duplicate named argument: {0}")]
    DuplicateNamed(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

/// Host commands
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    /// Call a method; `service` is `None` for the host's own service
    Call {
        service: Option<ServiceId>,
        path: MethodPath,
        positional: Vec<Value>,
        named: Map<String, Value>,
    },

    /// List live methods
    List,

    /// Quit the host
    Quit,
}

/// Host command parser
pub struct HostCommandParser;

impl HostCommandParser {
    /// Parses a command string
    pub fn parse(input: &str) -> Result<HostCommand, HostCommandError> {
        let input = input.trim();

        if input.is_empty() {
            return Err(HostCommandError::InvalidCommand(
                "Empty command".to_string(),
            ));
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "call" => Self::parse_call(None, &parts[1..]),
            "remote" => Self::parse_remote(&parts[1..]),
            "list" | "ls" => Ok(HostCommand::List),
            "quit" | "exit" => Ok(HostCommand::Quit),
            _ => Err(HostCommandError::UnknownCommand(cmd)),
        }
    }

    /// Parses the "remote" command
    fn parse_remote(args: &[&str]) -> Result<HostCommand, HostCommandError> {
        let Some((service, rest)) = args.split_first() else {
            return Err(HostCommandError::MissingArgument("service ID".to_string()));
        };
        Self::parse_call(Some(ServiceId::new(*service)?), rest)
    }

    /// Parses a method path followed by its arguments
    fn parse_call(
        service: Option<ServiceId>,
        args: &[&str],
    ) -> Result<HostCommand, HostCommandError> {
        let Some((path, rest)) = args.split_first() else {
            return Err(HostCommandError::MissingArgument("method path".to_string()));
        };
        let path = MethodPath::parse(*path)?;

        let mut positional = Vec::new();
        let mut named = Map::new();
        for word in rest {
            match Self::split_named(word) {
                Some((name, value)) => {
                    if named.insert(name.to_string(), Self::parse_value(value)).is_some() {
                        return Err(HostCommandError::DuplicateNamed(name.to_string()));
                    }
                }
                None => positional.push(Self::parse_value(word)),
            }
        }

        Ok(HostCommand::Call {
            service,
            path,
            positional,
            named,
        })
    }

    /// Splits `name=value` when `name` is a plain identifier
    fn split_named(word: &str) -> Option<(&str, &str)> {
        let (name, value) = word.split_once('=')?;
        let is_identifier = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit());
        is_identifier.then_some((name, value))
    }

    /// Reads a word as JSON, or as a plain string when it is not JSON
    fn parse_value(word: &str) -> Value {
        serde_json::from_str(word).unwrap_or_else(|_| Value::String(word.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(input: &str) -> (Option<ServiceId>, String, Vec<Value>, Map<String, Value>) {
        match HostCommandParser::parse(input).unwrap() {
            HostCommand::Call {
                service,
                path,
                positional,
                named,
            } => (service, path.as_str().to_string(), positional, named),
            other => panic!("expected a call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_call_positional() {
        let (service, path, positional, named) = call("call math.add 2 3");
        assert_eq!(service, None);
        assert_eq!(path, "math.add");
        assert_eq!(positional, vec![json!(2), json!(3)]);
        assert!(named.is_empty());
    }

    #[test]
    fn test_parse_call_json_and_plain_words() {
        let (_, _, positional, _) = call(r#"call echo true [1,2] "quoted" plain null"#);
        assert_eq!(
            positional,
            vec![json!(true), json!([1, 2]), json!("quoted"), json!("plain"), json!(null)]
        );
    }

    #[test]
    fn test_parse_call_named() {
        let (_, _, positional, named) = call("call scale 7 factor=3 label=big");
        assert_eq!(positional, vec![json!(7)]);
        assert_eq!(named.get("factor"), Some(&json!(3)));
        assert_eq!(named.get("label"), Some(&json!("big")));
    }

    #[test]
    fn test_equals_inside_value_is_positional() {
        let (_, _, positional, named) = call(r#"call echo "a=b" 1=2"#);
        assert_eq!(positional, vec![json!("a=b"), json!("1=2")]);
        assert!(named.is_empty());
    }

    #[test]
    fn test_parse_duplicate_named() {
        assert_eq!(
            HostCommandParser::parse("call scale factor=1 factor=2"),
            Err(HostCommandError::DuplicateNamed("factor".to_string()))
        );
    }

    #[test]
    fn test_parse_remote() {
        let (service, path, positional, _) = call("remote plugin.weather forecast.today 3");
        assert_eq!(service.unwrap().as_str(), "plugin.weather");
        assert_eq!(path, "forecast.today");
        assert_eq!(positional, vec![json!(3)]);
    }

    #[test]
    fn test_parse_missing_arguments() {
        assert!(matches!(
            HostCommandParser::parse("call"),
            Err(HostCommandError::MissingArgument(_))
        ));
        assert!(matches!(
            HostCommandParser::parse("remote"),
            Err(HostCommandError::MissingArgument(_))
        ));
        assert!(matches!(
            HostCommandParser::parse("remote calculator"),
            Err(HostCommandError::MissingArgument(_))
        ));
    }

    #[test]
    fn test_parse_invalid_path() {
        assert!(matches!(
            HostCommandParser::parse("call math..add"),
            Err(HostCommandError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(HostCommandParser::parse("list").unwrap(), HostCommand::List);
        assert_eq!(HostCommandParser::parse("LS").unwrap(), HostCommand::List);
        assert_eq!(HostCommandParser::parse("quit").unwrap(), HostCommand::Quit);
        assert_eq!(HostCommandParser::parse(" exit ").unwrap(), HostCommand::Quit);
    }

    #[test]
    fn test_parse_empty_and_unknown() {
        assert!(matches!(
            HostCommandParser::parse("   "),
            Err(HostCommandError::InvalidCommand(_))
        ));
        assert_eq!(
            HostCommandParser::parse("launch rocket"),
            Err(HostCommandError::UnknownCommand("launch".to_string()))
        );
    }
}
