//! Limit classification from directional evaluations

use serde::{Deserialize, Serialize};
use std::fmt;
use tangent_core::{Limit, Outcome};

/// Direction of approach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Both,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Both => "both",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" | "-" => Ok(Side::Left),
            "right" | "+" => Ok(Side::Right),
            "both" | "" => Ok(Side::Both),
            other => Err(format!("unknown side '{}', expected left, right or both", other)),
        }
    }
}

/// One directional evaluation as reported by the symbolic engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DirectionalLimit {
    Finite(f64),
    PosInfinity,
    NegInfinity,
    Undefined,
}

impl DirectionalLimit {
    /// Finite values must actually be finite
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            DirectionalLimit::Finite(value)
        } else if value == f64::INFINITY {
            DirectionalLimit::PosInfinity
        } else if value == f64::NEG_INFINITY {
            DirectionalLimit::NegInfinity
        } else {
            DirectionalLimit::Undefined
        }
    }
}

/// Pass a one-sided evaluation through
pub fn classify_one_sided(d: DirectionalLimit) -> Outcome<Limit> {
    match d {
        DirectionalLimit::Finite(v) => Outcome::value(v),
        DirectionalLimit::PosInfinity => Outcome::infinity(),
        DirectionalLimit::NegInfinity => Outcome::neg_infinity(),
        DirectionalLimit::Undefined => Outcome::undefined(),
    }
}

/// Combine left and right evaluations into a bilateral verdict
///
/// Finite sides must be exactly equal: the engine reports exact values, so
/// any difference means the one-sided limits disagree.
pub fn classify_bilateral(left: DirectionalLimit, right: DirectionalLimit) -> Outcome<Limit> {
    use DirectionalLimit::*;
    match (left, right) {
        (Finite(l), Finite(r)) if l == r => Outcome::value(l),
        (PosInfinity, PosInfinity) => Outcome::infinity(),
        (NegInfinity, NegInfinity) => Outcome::neg_infinity(),
        _ => Outcome::undefined(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangent_core::Verdict;

    #[test]
    fn test_equal_finite_sides() {
        let o = classify_bilateral(DirectionalLimit::Finite(2.0), DirectionalLimit::Finite(2.0));
        assert_eq!(o.as_value(), Some(2.0));
    }

    #[test]
    fn test_unequal_finite_sides() {
        let o = classify_bilateral(DirectionalLimit::Finite(2.0), DirectionalLimit::Finite(2.0 + 1e-12));
        assert!(o.is_undefined());
    }

    #[test]
    fn test_opposite_infinities() {
        let o = classify_bilateral(DirectionalLimit::NegInfinity, DirectionalLimit::PosInfinity);
        assert!(o.is_undefined());
    }

    #[test]
    fn test_same_infinities() {
        let pos = classify_bilateral(DirectionalLimit::PosInfinity, DirectionalLimit::PosInfinity);
        assert_eq!(pos.verdict(), &Verdict::Infinity);
        let neg = classify_bilateral(DirectionalLimit::NegInfinity, DirectionalLimit::NegInfinity);
        assert_eq!(neg.verdict(), &Verdict::NegInfinity);
    }

    #[test]
    fn test_undefined_side_poisons_result() {
        let o = classify_bilateral(DirectionalLimit::Undefined, DirectionalLimit::Finite(1.0));
        assert!(o.is_undefined());
    }

    #[test]
    fn test_one_sided_passthrough() {
        assert_eq!(classify_one_sided(DirectionalLimit::NegInfinity).verdict(), &Verdict::NegInfinity);
        assert_eq!(classify_one_sided(DirectionalLimit::Finite(0.5)).as_value(), Some(0.5));
        assert!(classify_one_sided(DirectionalLimit::Undefined).is_undefined());
    }

    #[test]
    fn test_from_value() {
        assert_eq!(DirectionalLimit::from_value(f64::INFINITY), DirectionalLimit::PosInfinity);
        assert_eq!(DirectionalLimit::from_value(f64::NAN), DirectionalLimit::Undefined);
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("LEFT".parse::<Side>().unwrap(), Side::Left);
        assert_eq!("+".parse::<Side>().unwrap(), Side::Right);
        assert!("up".parse::<Side>().is_err());
    }
}
