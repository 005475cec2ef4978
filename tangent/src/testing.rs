//! Shared fixtures for the engine tests

use crate::{Tangent, TangentConfig};
use serde_json::json;
use std::sync::Arc;
use tangent_solver::{HandlerWorker, Scripted, Unavailable};

/// Short budgets so fall-through tests stay fast
pub(crate) fn config() -> TangentConfig {
    TangentConfig {
        derivative_timeout_ms: 500,
        integral_timeout_ms: 500,
        limit_timeout_ms: 500,
        frame_ms: 5,
        ..Default::default()
    }
}

pub(crate) fn engine(worker: HandlerWorker) -> Tangent {
    Tangent::with_factory(config(), Arc::new(worker))
}

/// Engine with no symbolic engine behind it
pub(crate) fn offline() -> Tangent {
    Tangent::with_factory(config(), Arc::new(Unavailable))
}

/// Scripted engine answering directional limits of a few textbook functions
pub(crate) fn limit_table() -> HandlerWorker {
    HandlerWorker::new(|_, req| {
        let expr = req["expr"].as_str().unwrap_or_default();
        let side = req["side"].as_str().unwrap_or_default();
        match (expr, side) {
            ("(x**2-1)/(x-1)", _) => Scripted::ok(json!({ "kind": "value", "value": 2.0 })),
            ("sin(x)/x", _) => Scripted::ok(json!({ "kind": "value", "value": 1.0 })),
            ("1/x", "left") => Scripted::ok(json!({ "kind": "neg_infinity" })),
            ("1/x", "right") => Scripted::ok(json!({ "kind": "infinity" })),
            ("1/x", _) => Scripted::fail("undefined"),
            ("1/x**2", _) => Scripted::ok(json!({ "kind": "infinity" })),
            ("sign(x)", "left") => Scripted::ok(json!({ "kind": "value", "value": -1.0 })),
            ("sign(x)", "right") => Scripted::ok(json!({ "kind": "value", "value": 1.0 })),
            _ => Scripted::fail("parse_failed"),
        }
    })
}
