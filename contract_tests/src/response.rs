//! Response envelope contract tests
//!
//! Exactly one of `result` or `error`; errors carry a code prefix the caller
//! uses to tell failure kinds apart.

// ===== Field Names =====
pub const FIELD_RESULT: &str = "result";
pub const FIELD_ERROR: &str = "error";

// ===== Error Codes =====
pub const CODE_DECODE_ERROR: &str = "decode_error";
pub const CODE_UNKNOWN_METHOD: &str = "unknown_method";
pub const CODE_HANDLER_FAILURE: &str = "handler_failure";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use core_types::ServiceId;
    use ipc::{ErrorCode, LocalBus, ResponseEnvelope};
    use method_registry::{handler, Args, HandlerError, MethodRegistry};
    use remote_ipc::Dispatcher;
    use serde_json::json;

    /// A dispatcher over a small fixed registry
    fn dispatcher() -> Dispatcher {
        let mut registry = MethodRegistry::new();
        registry
            .register(
                "add",
                handler(|args: Args| Ok(args.arg::<i64>(0)? + args.arg::<i64>(1)?)),
            )
            .unwrap();
        registry
            .register(
                "fail",
                handler(|_args: Args| -> Result<(), HandlerError> {
                    Err(HandlerError::failed("nope"))
                }),
            )
            .unwrap();
        Dispatcher::with_registry(
            ServiceId::new("calculator").unwrap(),
            registry,
            LocalBus::new(),
        )
    }

    #[test]
    fn test_error_code_spelling() {
        assert_eq!(ErrorCode::DecodeError.as_str(), CODE_DECODE_ERROR);
        assert_eq!(ErrorCode::UnknownMethod.as_str(), CODE_UNKNOWN_METHOD);
        assert_eq!(ErrorCode::HandlerFailure.as_str(), CODE_HANDLER_FAILURE);
    }

    #[test]
    fn test_success_shape() {
        let payload = ResponseEnvelope::result(json!({"sum": 5})).encode().unwrap();
        verify_keys(&payload, &[FIELD_RESULT]);
        assert_eq!(payload, r#"{"result":{"sum":5}}"#);
    }

    #[test]
    fn test_null_result_is_still_a_result() {
        let payload = ResponseEnvelope::result(json!(null)).encode().unwrap();
        assert_eq!(payload, r#"{"result":null}"#);
        assert_eq!(
            ResponseEnvelope::decode(&payload).unwrap(),
            ResponseEnvelope::Result(json!(null))
        );
    }

    #[test]
    fn test_error_shape() {
        let payload = ResponseEnvelope::failure(ErrorCode::HandlerFailure, "boom")
            .encode()
            .unwrap();
        verify_keys(&payload, &[FIELD_ERROR]);
        assert_eq!(payload, r#"{"error":"handler_failure: boom"}"#);
    }

    #[test]
    fn test_response_must_have_exactly_one_field() {
        for payload in [
            r#"{}"#,
            r#"{"result":1,"error":"x"}"#,
            r#"{"error":1}"#,
            r#"{"value":1}"#,
            r#"42"#,
        ] {
            assert!(ResponseEnvelope::decode(payload).is_err(), "accepted {}", payload);
        }
    }

    #[test]
    fn test_dispatcher_golden_responses() {
        let dispatcher = dispatcher();
        assert_eq!(
            dispatcher.dispatch(r#"{"methodPath":"add","positionalArgs":[2,3],"namedArgs":{}}"#),
            r#"{"result":5}"#
        );
        assert_eq!(
            dispatcher.dispatch(r#"{"methodPath":"missing","positionalArgs":[],"namedArgs":{}}"#),
            r#"{"error":"unknown_method: no method 'missing'"}"#
        );
        assert_eq!(
            dispatcher.dispatch(r#"{"methodPath":"fail","positionalArgs":[],"namedArgs":{}}"#),
            r#"{"error":"handler_failure: nope"}"#
        );

        let decode_failure = dispatcher.dispatch("not json");
        let object = parse_object(&decode_failure);
        let error = object[FIELD_ERROR].as_str().unwrap();
        assert!(error.starts_with("decode_error: "), "{}", error);
    }
}
