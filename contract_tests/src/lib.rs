//! # Wire Contract Tests
//!
//! This crate provides "golden" tests for the bus RPC wire format to ensure
//! it doesn't drift accidentally over time.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: Field names, addressing and error codes are
//!   written out literally
//! - **Testability first**: Contract tests fail when the wire format changes
//! - **Mechanism not policy**: Define what must be stable, not how to use it
//!
//! ## Structure
//!
//! - [`addressing`]: sender/topic layout of requests and responses
//! - [`request`]: request envelope field names and strictness
//! - [`response`]: response envelope shape and error-code prefixes

pub mod addressing;
pub mod request;
pub mod response;

/// Common test helpers for contract validation
pub mod test_helpers {
    use serde_json::Value;

    /// Parses a payload as a JSON object, failing the test otherwise
    pub fn parse_object(payload: &str) -> serde_json::Map<String, Value> {
        match serde_json::from_str(payload) {
            Ok(Value::Object(object)) => object,
            other => panic!("payload is not a JSON object: {:?}", other),
        }
    }

    /// Verifies a payload has exactly the expected top-level keys
    pub fn verify_keys(payload: &str, expected: &[&str]) {
        let object = parse_object(payload);
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = expected.to_vec();
        expected.sort_unstable();
        assert_eq!(
            keys, expected,
            "Envelope fields changed: expected {:?}, got {:?}",
            expected, keys
        );
    }
}
