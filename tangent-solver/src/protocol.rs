//! Wire protocol of the symbolic engine
//!
//! One JSON object per line. Requests carry an `id` the worker echoes back
//! together with `ok`. Successful replies carry the capability's fields,
//! failures carry an `error` string.

use crate::error::SolverError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use tangent_core::{Derivative, Integral, Kind, Limit};
use tangent_numeric::{DirectionalLimit, Side};

/// Request/reply pair of one capability
pub trait Capability: Kind {
    type Request: Serialize + Debug + Send + 'static;
    type Reply: DeserializeOwned + Debug + Send + 'static;
}

impl Capability for Derivative {
    type Request = DerivativeRequest;
    type Reply = DerivativeReply;
}

impl Capability for Integral {
    type Request = IntegralRequest;
    type Reply = IntegralReply;
}

impl Capability for Limit {
    type Request = LimitRequest;
    type Reply = LimitReply;
}

/// Rewrite user syntax into the engine's dialect
pub fn preprocess(expr: &str) -> String {
    expr.replace('^', "**")
        .replace("√(", "sqrt(")
        .replace("ln(", "log(")
        .replace('×', "*")
        .replace('÷', "/")
}

/// Rewrite engine output back into user syntax
pub fn postprocess(expr: &str) -> String {
    expr.replace("**", "^")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeRequest {
    pub expr: String,
    pub at: f64,
    pub variable: String,
}

impl DerivativeRequest {
    pub fn new(expr: &str, at: f64, variable: &str) -> Self {
        Self { expr: preprocess(expr), at, variable: variable.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DerivativeReply {
    Value {
        value: f64,
        #[serde(default)]
        derivative: Option<String>,
    },
    Undefined {
        #[serde(default)]
        derivative: Option<String>,
    },
}

impl DerivativeReply {
    /// Derivative text in user syntax
    pub fn derivative_text(&self) -> Option<String> {
        match self {
            DerivativeReply::Value { derivative, .. } | DerivativeReply::Undefined { derivative } => {
                derivative.as_deref().map(postprocess)
            }
        }
    }
}

/// Bounds are `null` for an indefinite-only request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegralRequest {
    pub expr: String,
    pub variable: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl IntegralRequest {
    pub fn definite(expr: &str, variable: &str, lower: f64, upper: f64) -> Self {
        Self { expr: preprocess(expr), variable: variable.to_string(), lower: Some(lower), upper: Some(upper) }
    }

    pub fn indefinite(expr: &str, variable: &str) -> Self {
        Self { expr: preprocess(expr), variable: variable.to_string(), lower: None, upper: None }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IntegralReply {
    #[serde(default)]
    pub indefinite: Option<String>,
    #[serde(default)]
    pub definite: Option<f64>,
}

impl IntegralReply {
    pub fn indefinite_text(&self) -> Option<String> {
        self.indefinite.as_deref().map(postprocess)
    }

    pub fn definite_value(&self) -> Option<f64> {
        self.definite.filter(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitRequest {
    pub expr: String,
    pub a: f64,
    pub side: Side,
}

impl LimitRequest {
    pub fn new(expr: &str, a: f64, side: Side) -> Self {
        Self { expr: preprocess(expr), a, side }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LimitReply {
    Value { value: f64 },
    Infinity,
    NegInfinity,
}

/// Error text the engine uses for a mathematically undefined limit
pub const UNDEFINED_LIMIT: &str = "undefined";

/// Interpret a one-sided limit answer
///
/// `ok: false` with error `"undefined"` is an answer, not a failure.
pub fn directional(result: Result<LimitReply, SolverError>) -> Result<DirectionalLimit, SolverError> {
    match result {
        Ok(LimitReply::Value { value }) => Ok(DirectionalLimit::from_value(value)),
        Ok(LimitReply::Infinity) => Ok(DirectionalLimit::PosInfinity),
        Ok(LimitReply::NegInfinity) => Ok(DirectionalLimit::NegInfinity),
        Err(SolverError::Remote(msg)) if msg == UNDEFINED_LIMIT => Ok(DirectionalLimit::Undefined),
        Err(e) => Err(e),
    }
}

/// Serialize a request with its id
pub fn encode<R: Serialize>(id: u64, request: &R) -> Result<String, SolverError> {
    let mut body = match serde_json::to_value(request)? {
        Value::Object(map) => map,
        other => {
            return Err(SolverError::Protocol(format!("request must be an object, got {}", other)));
        }
    };
    body.insert("id".to_string(), Value::from(id));
    Ok(serde_json::to_string(&Value::Object(body))?)
}

/// A reply line split into its id and outcome
#[derive(Debug)]
pub struct Envelope {
    pub id: u64,
    pub body: Result<Value, SolverError>,
}

/// Parse one reply line
pub fn decode(line: &str) -> Result<Envelope, SolverError> {
    let value: Value = serde_json::from_str(line)?;
    let map: &Map<String, Value> = value
        .as_object()
        .ok_or_else(|| SolverError::Protocol("reply is not an object".to_string()))?;
    let id = map
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| SolverError::Protocol("reply has no numeric id".to_string()))?;
    let ok = map.get("ok").and_then(Value::as_bool).unwrap_or(false);

    let body = if ok {
        Ok(value)
    } else {
        let msg = match map.get("error") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => "unknown error".to_string(),
        };
        Err(SolverError::Remote(msg))
    };
    Ok(Envelope { id, body })
}

/// Typed view of a successful reply body
pub fn reply<C: Capability>(body: Value) -> Result<C::Reply, SolverError> {
    Ok(serde_json::from_value(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preprocess() {
        assert_eq!(preprocess("x^2 + √(x) × ln(x) ÷ 2"), "x**2 + sqrt(x) * log(x) / 2");
    }

    #[test]
    fn test_postprocess() {
        assert_eq!(postprocess("x**3/3"), "x^3/3");
    }

    #[test]
    fn test_encode_adds_id() {
        let line = encode(7, &LimitRequest::new("1/x", 0.0, Side::Left)).unwrap();
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v, json!({"id": 7, "expr": "1/x", "a": 0.0, "side": "left"}));
    }

    #[test]
    fn test_indefinite_request_has_null_bounds() {
        let line = encode(1, &IntegralRequest::indefinite("x^2", "x")).unwrap();
        let v: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["expr"], "x**2");
        assert!(v["lower"].is_null());
        assert!(v["upper"].is_null());
    }

    #[test]
    fn test_decode_success() {
        let env = decode(r#"{"id":3,"ok":true,"kind":"value","value":2.0,"derivative":"2*x"}"#).unwrap();
        assert_eq!(env.id, 3);
        let r = reply::<Derivative>(env.body.unwrap()).unwrap();
        assert_eq!(r, DerivativeReply::Value { value: 2.0, derivative: Some("2*x".into()) });
    }

    #[test]
    fn test_decode_failure() {
        let env = decode(r#"{"id":4,"ok":false,"error":"undefined"}"#).unwrap();
        let err = env.body.unwrap_err();
        assert_eq!(directional(Err(err)).unwrap(), DirectionalLimit::Undefined);
    }

    #[test]
    fn test_decode_rejects_missing_id() {
        assert!(matches!(decode(r#"{"ok":true}"#), Err(SolverError::Protocol(_))));
        assert!(matches!(decode("not json"), Err(SolverError::Protocol(_))));
    }

    #[test]
    fn test_limit_reply_kinds() {
        let inf = reply::<Limit>(json!({"id": 1, "ok": true, "kind": "neg_infinity"})).unwrap();
        assert_eq!(directional(Ok(inf)).unwrap(), DirectionalLimit::NegInfinity);
        let other = directional(Err(SolverError::Remote("parse_failed:zoo".into())));
        assert!(other.is_err());
    }

    #[test]
    fn test_integral_reply_texts() {
        let r = reply::<Integral>(json!({"indefinite": "x**3/3", "definite": null})).unwrap();
        assert_eq!(r.indefinite_text().as_deref(), Some("x^3/3"));
        assert_eq!(r.definite_value(), None);
    }
}
