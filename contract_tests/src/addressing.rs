//! Addressing contract tests
//!
//! The destination always sits in `sender`; the routing key is the topic
//! remainder after the first separator.

use core_types::{CorrelationToken, ServiceId};

// ===== Addressing Contract =====
pub const TOPIC_NAMESPACE: &str = "rpc";
pub const TOKEN_LENGTH: usize = 32;

/// Builds a service identifier for contract checks
pub fn service(id: &str) -> ServiceId {
    match ServiceId::new(id) {
        Ok(id) => id,
        Err(err) => panic!("invalid contract identifier {:?}: {}", id, err),
    }
}

/// Whether a token has the contract's simple-hex form
pub fn is_simple_hex(token: &CorrelationToken) -> bool {
    let text = token.as_str();
    text.len() == TOKEN_LENGTH
        && text
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipc::{routing_key, RequestAddress, ResponseAddress};

    #[test]
    fn test_namespace_is_stable() {
        assert_eq!(ipc::TOPIC_NAMESPACE, TOPIC_NAMESPACE);
    }

    #[test]
    fn test_token_format() {
        for _ in 0..16 {
            let token = CorrelationToken::new();
            assert!(is_simple_hex(&token), "unexpected token form {}", token);
        }
    }

    #[test]
    fn test_request_layout() {
        let token = CorrelationToken::new();
        let message = RequestAddress::new(service("calculator"), token.clone()).to_message("{}");

        assert_eq!(message.sender, "calculator");
        assert_eq!(message.topic, format!("rpc.{}", token.as_str()));
    }

    #[test]
    fn test_response_layout() {
        let token = CorrelationToken::new();
        let message = ResponseAddress::new(token.clone(), service("calculator")).to_message("{}");

        assert_eq!(message.sender, token.as_str());
        assert_eq!(message.topic, "rpc.calculator");
    }

    #[test]
    fn test_dotted_identifiers_survive_routing() {
        let token = CorrelationToken::new();
        let id = service("plugin.video.example");
        let message = ResponseAddress::new(token.clone(), id.clone()).to_message("{}");

        assert_eq!(message.topic, "rpc.plugin.video.example");
        assert_eq!(routing_key(&message.topic), Some("plugin.video.example"));
        assert!(ResponseAddress::new(token, id).matches(&message.sender, &message.topic));
    }

    #[test]
    fn test_receivers_ignore_namespace_value() {
        let token = CorrelationToken::new();
        let topic = format!("Other.{}", token.as_str());
        let address = RequestAddress::parse("calculator", &topic).unwrap();
        assert_eq!(address.token, token);
    }
}
