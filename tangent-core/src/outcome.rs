//! Computation outcomes
//!
//! An `Outcome<K>` is the final answer of one capability (limit, derivative
//! or integral). It carries exactly one verdict, the provenance of that
//! verdict and, where it makes sense, the symbolic expression text.

use crate::TangentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Capability marker
pub trait Kind: fmt::Debug + Clone + Copy + PartialEq + Send + Sync + 'static {
    const NAME: &'static str;
}

/// Capabilities whose outcomes may carry symbolic expression text
pub trait CarriesExpression: Kind {}

/// Limits may diverge to either infinity
pub trait Unbounded: Kind {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Derivative;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Integral;

impl Kind for Limit {
    const NAME: &'static str = "limit";
}
impl Kind for Derivative {
    const NAME: &'static str = "derivative";
}
impl Kind for Integral {
    const NAME: &'static str = "integral";
}

impl Unbounded for Limit {}
impl CarriesExpression for Derivative {}
impl CarriesExpression for Integral {}

/// The single active tag of an outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    /// Always finite
    Value { value: f64 },
    Infinity,
    NegInfinity,
    /// A legitimate mathematical answer (undefined or indeterminate)
    Undefined,
    /// A computational failure
    Error { cause: TangentError },
}

impl Verdict {
    pub fn tag(&self) -> &'static str {
        match self {
            Verdict::Value { .. } => "value",
            Verdict::Infinity => "infinity",
            Verdict::NegInfinity => "neg_infinity",
            Verdict::Undefined => "undefined",
            Verdict::Error { .. } => "error",
        }
    }
}

/// Which stage produced a reported result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Local symbolic differentiation
    Symbolic,
    /// The remote symbolic engine
    SymbolicEngine,
    /// Local numeric estimate
    Numeric,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Provenance::Symbolic => "Symbolic",
            Provenance::SymbolicEngine => "Symbolic engine",
            Provenance::Numeric => "Numeric",
        };
        f.write_str(label)
    }
}

/// Final answer for capability `K`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(bound = "")]
pub struct Outcome<K: Kind> {
    #[serde(flatten)]
    verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<Provenance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
    #[serde(skip)]
    kind: PhantomData<K>,
}

impl<K: Kind> Outcome<K> {
    fn from_verdict(verdict: Verdict) -> Self {
        Self { verdict, note: None, expression: None, kind: PhantomData }
    }

    /// A numeric answer. Non-finite input degrades to `undefined`.
    pub fn value(value: f64) -> Self {
        if value.is_finite() {
            Self::from_verdict(Verdict::Value { value })
        } else {
            Self::undefined()
        }
    }

    pub fn undefined() -> Self {
        Self::from_verdict(Verdict::Undefined)
    }

    pub fn error(cause: TangentError) -> Self {
        Self::from_verdict(Verdict::Error { cause: cause.in_capability(K::NAME) })
    }

    /// Builder: set provenance note
    pub fn with_note(mut self, note: Provenance) -> Self {
        self.note = Some(note);
        self
    }

    pub fn verdict(&self) -> &Verdict {
        &self.verdict
    }

    pub fn note(&self) -> Option<Provenance> {
        self.note
    }

    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn as_value(&self) -> Option<f64> {
        match self.verdict {
            Verdict::Value { value } => Some(value),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&TangentError> {
        match &self.verdict {
            Verdict::Error { cause } => Some(cause),
            _ => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self.verdict, Verdict::Value { .. })
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.verdict, Verdict::Undefined)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.verdict, Verdict::Error { .. })
    }
}

impl<K: Unbounded> Outcome<K> {
    pub fn infinity() -> Self {
        Self::from_verdict(Verdict::Infinity)
    }

    pub fn neg_infinity() -> Self {
        Self::from_verdict(Verdict::NegInfinity)
    }
}

impl<K: CarriesExpression> Outcome<K> {
    /// Builder: attach symbolic expression text
    pub fn with_expression(mut self, expression: Option<String>) -> Self {
        self.expression = expression;
        self
    }

    /// Keep existing text, otherwise take `fallback`
    pub fn or_expression(mut self, fallback: Option<String>) -> Self {
        if self.expression.is_none() {
            self.expression = fallback;
        }
        self
    }
}

impl<K: Kind> fmt::Display for Outcome<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.verdict {
            Verdict::Value { value } => write!(f, "{}", round6(*value)),
            Verdict::Infinity => f.write_str("∞"),
            Verdict::NegInfinity => f.write_str("−∞"),
            Verdict::Undefined => f.write_str("Undefined"),
            Verdict::Error { cause } => write!(f, "Error: {}", cause.message),
        }
    }
}

fn round6(v: f64) -> f64 {
    let p = 1e6;
    (v * p).round() / p
}
