//! Registry Lifecycle Tests
//!
//! Methods are live only while a serve cycle runs. Between cycles the
//! service still answers, so callers learn the method is gone instead of
//! waiting for a timeout.

use ipc::LocalBus;
use method_registry::{handler, Args, HandlerError, MethodTable, RegistryError};
use remote_ipc::{RpcError, ServeError, Service};
use serde_json::json;
use std::sync::Arc;
use tests_resilience::{
    calculator_node, calculator_table, service_id, test_client, test_config, TestNode,
    DELIVERY_MODES,
};

#[test]
fn test_stopped_service_reports_unknown_method() {
    for mode in DELIVERY_MODES {
        let bus = LocalBus::with_mode(mode);
        let mut node = calculator_node(&bus, "calculator");
        let add = test_client(&bus).target(node.id().clone()).path("add");

        assert_eq!(add.call(vec![json!(2), json!(3)]).unwrap(), json!(5));

        node.stop().unwrap();
        assert!(node.service().live_methods().is_empty());

        let err = add.call(vec![json!(2), json!(3)]).unwrap_err();
        assert!(
            matches!(err, RpcError::UnknownMethod { ref path, .. } if path == "add"),
            "mode {:?}: {:?}",
            mode,
            err
        );
    }
}

#[test]
fn test_restart_restores_declared_methods_only() {
    let bus = LocalBus::new();
    let service = Arc::new(Service::with_config(
        service_id("calculator"),
        bus.clone(),
        test_config(),
    ));
    service.register_table(calculator_table()).unwrap();
    let target = test_client(&bus).target(service.id().clone());

    let extra = MethodTable::new().method("answer", |_args: Args| Ok::<_, HandlerError>(42));
    let mut node = TestNode::serve(service.clone(), vec![("extra".to_string(), extra)]);
    assert_eq!(target.path("extra").path("answer").call(vec![]).unwrap(), json!(42));
    node.stop().unwrap();

    // Namespaces passed to serve belong to that cycle only.
    let mut node = TestNode::serve(service.clone(), Vec::new());
    assert_eq!(target.path("add").call(vec![json!(1), json!(1)]).unwrap(), json!(2));
    assert!(matches!(
        target.path("extra").path("answer").call(vec![]),
        Err(RpcError::UnknownMethod { .. })
    ));
    node.stop().unwrap();
}

#[test]
fn test_registration_while_serving_is_live() {
    let bus = LocalBus::new();
    let node = calculator_node(&bus, "calculator");
    let target = test_client(&bus).target(node.id().clone());

    assert!(matches!(
        target.path("late").call(vec![]),
        Err(RpcError::UnknownMethod { .. })
    ));

    node.service()
        .register("late", handler(|_args: Args| Ok::<_, HandlerError>("here")))
        .unwrap();
    assert_eq!(target.path("late").call(vec![]).unwrap(), json!("here"));
    assert!(node.service().declared_methods().contains(&"late".to_string()));
}

#[test]
fn test_second_serve_is_rejected() {
    let bus = LocalBus::new();
    let node = calculator_node(&bus, "calculator");

    let result = node
        .service()
        .serve(&lifecycle::CancellationToken::none(), Vec::new());
    assert!(matches!(result, Err(ServeError::AlreadyServing)));

    // The running cycle is unaffected.
    let add = test_client(&bus).target(node.id().clone()).path("add");
    assert_eq!(add.call(vec![json!(2), json!(2)]).unwrap(), json!(4));
}

#[test]
fn test_invalid_namespace_fails_serve() {
    let bus = LocalBus::new();
    let service = Arc::new(Service::with_config(
        service_id("calculator"),
        bus.clone(),
        test_config(),
    ));
    let mut node = TestNode::serve(
        service.clone(),
        vec![("_private".to_string(), calculator_table())],
    );

    let result = node.stop();
    assert!(matches!(
        result,
        Err(ServeError::Registry(RegistryError::ReservedName(_)))
    ));
    assert!(!service.is_serving());
    assert!(service.live_methods().is_empty());
}

#[test]
fn test_live_surface_is_auditable() {
    let bus = LocalBus::new();
    let node = calculator_node(&bus, "calculator");

    let methods = node.service().live_methods();
    assert!(methods.contains(&"add".to_string()));
    assert!(methods.contains(&"math.add".to_string()));
    assert!(methods.iter().all(|name| !name.split('.').any(|s| s.starts_with('_'))));
    let mut sorted = methods.clone();
    sorted.sort();
    assert_eq!(methods, sorted);
}
