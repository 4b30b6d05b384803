//! # Built-in Methods
//!
//! The methods every host serves:
//!
//! - `ping`, `echo` at the top level
//! - `math.*` from [`Calculator`]
//! - `system.methods`, listing what is live

use method_registry::{handler, Args, HandlerError, MethodSet, MethodTable};
use remote_ipc::{ServeError, Service};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Namespace the calculator is served under
pub const MATH_NAMESPACE: &str = "math";

/// Namespace for host introspection
pub const SYSTEM_NAMESPACE: &str = "system";

/// Integer-preserving arithmetic over JSON numbers
#[derive(Debug, Default)]
pub struct Calculator {
    calls: AtomicU64,
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of arithmetic calls answered so far
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn binary(
        &self,
        args: &Args,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> Result<Value, HandlerError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let (a, b): (Value, Value) = (args.arg(0)?, args.arg(1)?);
        if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
            if let Some(result) = int_op(x, y) {
                return Ok(json!(result));
            }
        }
        let (x, y): (f64, f64) = (args.arg(0)?, args.arg(1)?);
        Ok(json!(float_op(x, y)))
    }

    fn divide(&self, args: &Args) -> Result<Value, HandlerError> {
        let divisor: f64 = args.arg(1)?;
        if divisor == 0.0 {
            return Err(HandlerError::failed("division by zero"));
        }
        self.binary(
            args,
            |x, y| x.checked_rem(y).filter(|r| *r == 0).and_then(|_| x.checked_div(y)),
            |x, y| x / y,
        )
    }

    fn sum(&self, args: &Args) -> Result<Value, HandlerError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let mut int_total: Option<i64> = Some(0);
        let mut float_total = 0.0;
        for index in 0..args.len() {
            let value: Value = args.arg(index)?;
            let number: f64 = args.arg(index)?;
            int_total = int_total
                .zip(value.as_i64())
                .and_then(|(total, n)| total.checked_add(n));
            float_total += number;
        }
        Ok(match int_total {
            Some(total) => json!(total),
            None => json!(float_total),
        })
    }
}

impl MethodSet for Calculator {
    fn method_table(self: Arc<Self>) -> MethodTable {
        let add = self.clone();
        let sub = self.clone();
        let mul = self.clone();
        let div = self.clone();
        let sum = self.clone();
        MethodTable::new()
            .method("add", move |args: Args| {
                add.binary(&args, i64::checked_add, |x, y| x + y)
            })
            .method("sub", move |args: Args| {
                sub.binary(&args, i64::checked_sub, |x, y| x - y)
            })
            .method("mul", move |args: Args| {
                mul.binary(&args, i64::checked_mul, |x, y| x * y)
            })
            .method("div", move |args: Args| div.divide(&args))
            .method("sum", move |args: Args| sum.sum(&args))
            .method("calls", move |_args: Args| Ok::<_, HandlerError>(self.calls()))
    }
}

/// `system.*` methods; they hold the service weakly so it can still be dropped
pub fn system_table(service: Weak<Service>) -> MethodTable {
    MethodTable::new().method("methods", move |_args: Args| {
        let service = service
            .upgrade()
            .ok_or_else(|| HandlerError::failed("service is gone"))?;
        Ok::<_, HandlerError>(service.live_methods())
    })
}

/// Declares every built-in method on `service`
pub fn install(service: &Arc<Service>, calculator: Arc<Calculator>) -> Result<usize, ServeError> {
    service.register("ping", handler(|_args: Args| Ok::<_, HandlerError>("pong")))?;
    service.register(
        "echo",
        handler(|args: Args| Ok::<_, HandlerError>(args.positional_args().to_vec())),
    )?;
    let math = service.register_set(MATH_NAMESPACE, calculator)?;
    let system =
        service.register_namespace(SYSTEM_NAMESPACE, system_table(Arc::downgrade(service)))?;
    Ok(2 + math + system)
}
