//! Call Round-Trip Tests
//!
//! Calls made through a call target reach the right handler and come back
//! with the handler's value, under both bus delivery modes.

use identity::FixedIdentity;
use ipc::{ErrorCode, LocalBus};
use remote_ipc::RpcError;
use serde_json::{json, Map, Value};
use tests_resilience::{calculator_node, service_id, test_client, DELIVERY_MODES};

#[test]
fn test_add_returns_sum() {
    for mode in DELIVERY_MODES {
        let bus = LocalBus::with_mode(mode);
        let node = calculator_node(&bus, "calculator");
        let calculator = test_client(&bus).target(node.id().clone());

        let sum = calculator.path("add").call(vec![json!(2), json!(3)]).unwrap();
        assert_eq!(sum, json!(5), "mode {:?}", mode);
    }
}

#[test]
fn test_namespaced_method() {
    for mode in DELIVERY_MODES {
        let bus = LocalBus::with_mode(mode);
        let node = calculator_node(&bus, "calculator");
        let math = test_client(&bus).target(node.id().clone()).path("math");

        let sum: i64 = math.path("add").call_as(vec![json!(2), json!(3)]).unwrap();
        assert_eq!(sum, 5, "mode {:?}", mode);
        let product: i64 = math.path("mul").call_as(vec![json!(4), json!(5)]).unwrap();
        assert_eq!(product, 20, "mode {:?}", mode);
    }
}

#[test]
fn test_values_round_trip_unchanged() {
    let values = vec![
        json!(null),
        json!(true),
        json!(-17),
        json!(2.5),
        json!("ünïcödé ✓"),
        json!([1, [2, [3]]]),
        json!({"nested": {"list": [null, "x"], "empty": {}}}),
    ];

    for mode in DELIVERY_MODES {
        let bus = LocalBus::with_mode(mode);
        let node = calculator_node(&bus, "calculator");
        let echo = test_client(&bus).target(node.id().clone()).path("echo");

        let result = echo.call(values.clone()).unwrap();
        assert_eq!(result, Value::Array(values.clone()), "mode {:?}", mode);
    }
}

#[test]
fn test_named_arguments() {
    let bus = LocalBus::new();
    let node = calculator_node(&bus, "calculator");
    let scale = test_client(&bus).target(node.id().clone()).path("scale");

    let mut named = Map::new();
    named.insert("factor".to_string(), json!(3));
    assert_eq!(scale.call_with(vec![json!(7)], named).unwrap(), json!(21));
    assert_eq!(scale.call(vec![json!(7)]).unwrap(), json!(7));
}

#[test]
fn test_missing_method_names_the_path() {
    for mode in DELIVERY_MODES {
        let bus = LocalBus::with_mode(mode);
        let node = calculator_node(&bus, "calculator");
        let target = test_client(&bus).target(node.id().clone());

        let err = target.path("missing").call(vec![]).unwrap_err();
        match &err {
            RpcError::UnknownMethod { path, message } => {
                assert_eq!(path, "missing");
                assert!(message.contains("missing"), "{}", message);
            }
            other => panic!("expected UnknownMethod, got {:?}", other),
        }
        assert!(err.to_string().starts_with("remote error:"));
    }
}

#[test]
fn test_handler_failure_keeps_service_alive() {
    for mode in DELIVERY_MODES {
        let bus = LocalBus::with_mode(mode);
        let node = calculator_node(&bus, "calculator");
        let target = test_client(&bus).target(node.id().clone());

        let err = target.path("div").call(vec![json!(1), json!(0)]).unwrap_err();
        assert!(
            matches!(
                err,
                RpcError::Remote { kind: ErrorCode::HandlerFailure, ref message }
                    if message.contains("division by zero")
            ),
            "got {:?}",
            err
        );
        assert_eq!(err.to_string(), "remote error: division by zero");

        let quotient = target.path("div").call(vec![json!(9), json!(3)]).unwrap();
        assert_eq!(quotient, json!(3), "mode {:?}", mode);
    }
}

#[test]
fn test_handler_panic_is_reported() {
    let bus = LocalBus::new();
    let node = calculator_node(&bus, "calculator");
    let target = test_client(&bus).target(node.id().clone());

    let err = target.path("explode").call(vec![]).unwrap_err();
    assert!(matches!(err, RpcError::Remote { kind: ErrorCode::HandlerFailure, .. }));
    assert!(err.to_string().contains("calculator exploded"));

    assert_eq!(target.path("add").call(vec![json!(1), json!(1)]).unwrap(), json!(2));
}

#[test]
fn test_bad_argument_is_a_remote_failure() {
    let bus = LocalBus::new();
    let node = calculator_node(&bus, "calculator");
    let add = test_client(&bus).target(node.id().clone()).path("add");

    let err = add.call(vec![json!("two")]).unwrap_err();
    assert!(err.is_remote());
    assert!(!matches!(err, RpcError::UnknownMethod { .. }));
}

#[test]
fn test_dotted_service_identifier() {
    let bus = LocalBus::new();
    let node = calculator_node(&bus, "plugin.video.calculator");
    let target = test_client(&bus).target(service_id("plugin.video.calculator"));

    assert_eq!(node.id().as_str(), "plugin.video.calculator");
    assert_eq!(
        target.path("math").path("sub").call(vec![json!(5), json!(2)]).unwrap(),
        json!(3)
    );
}

#[test]
fn test_local_target_uses_own_identity() {
    let bus = LocalBus::new();
    let node = calculator_node(&bus, "self.calculator");
    let resolver = FixedIdentity::new(node.id().clone());

    let target = test_client(&bus).local_target(&resolver).unwrap();
    assert_eq!(target.target(), node.id());
    assert_eq!(target.path("add").call(vec![json!(1), json!(2)]).unwrap(), json!(3));
}

#[test]
fn test_services_on_one_bus_do_not_answer_for_each_other() {
    let bus = LocalBus::new();
    let _a = calculator_node(&bus, "alpha");
    let _b = calculator_node(&bus, "beta");
    let client = test_client(&bus);

    for id in ["alpha", "beta"] {
        let sum = client
            .target(service_id(id))
            .path("add")
            .call(vec![json!(20), json!(22)])
            .unwrap();
        assert_eq!(sum, json!(42));
    }
}
