//! Tangent Core - Fundamental types
//!
//! This crate provides the core types used throughout Tangent:
//! - `Outcome<K>`: final answer of a limit, derivative or integral
//! - `Verdict`: the single active tag of an outcome
//! - `Provenance`: which stage produced an answer
//! - `TangentError`: structured errors

mod error;
mod outcome;

pub use error::{codes, ErrorContext, Severity, TangentError};
pub use outcome::{
    CarriesExpression, Derivative, Integral, Kind, Limit, Outcome, Provenance, Unbounded, Verdict,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::codes;
    pub use crate::{
        Derivative, Integral, Limit, Outcome, Provenance, Severity, TangentError, Verdict,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_value_keeps_finite_number() {
            let o = Outcome::<Derivative>::value(6.0);
            assert_eq!(o.as_value(), Some(6.0));
            assert!(o.is_value());
        }

        #[test]
        fn test_non_finite_value_degrades_to_undefined() {
            assert!(Outcome::<Integral>::value(f64::NAN).is_undefined());
            assert!(Outcome::<Limit>::value(f64::INFINITY).is_undefined());
        }

        #[test]
        fn test_error_records_capability() {
            let o = Outcome::<Limit>::error(TangentError::exhausted("no stage answered"));
            let cause = o.as_error().unwrap();
            assert!(cause.is(codes::EXHAUSTED));
            assert_eq!(cause.context.as_ref().unwrap().capability.as_deref(), Some("limit"));
        }

        #[test]
        fn test_undefined_and_error_are_distinct() {
            let u = Outcome::<Derivative>::undefined();
            let e = Outcome::<Derivative>::error(TangentError::parse_error("bad"));
            assert_ne!(u.verdict().tag(), e.verdict().tag());
            assert!(!u.is_error());
            assert!(!e.is_undefined());
        }

        #[test]
        fn test_or_expression_fills_only_missing_text() {
            let remote = Outcome::<Derivative>::value(1.0)
                .with_expression(Some("2*x".to_string()))
                .or_expression(Some("2 * x".to_string()));
            assert_eq!(remote.expression(), Some("2*x"));

            let bare = Outcome::<Derivative>::value(1.0).or_expression(Some("cos(x)".to_string()));
            assert_eq!(bare.expression(), Some("cos(x)"));
        }

        #[test]
        fn test_serializes_as_tagged_object() {
            let o = Outcome::<Limit>::neg_infinity().with_note(Provenance::SymbolicEngine);
            let json = serde_json::to_value(&o).unwrap();
            assert_eq!(json["kind"], "neg_infinity");
            assert_eq!(json["note"], "symbolic_engine");
            assert!(json.get("expression").is_none());

            let v = serde_json::to_value(Outcome::<Integral>::value(0.5)).unwrap();
            assert_eq!(v["kind"], "value");
            assert_eq!(v["value"], 0.5);
        }

        #[test]
        fn test_display() {
            assert_eq!(Outcome::<Limit>::infinity().to_string(), "∞");
            assert_eq!(Outcome::<Limit>::value(1.0 / 3.0).to_string(), "0.333333");
            assert_eq!(Outcome::<Derivative>::undefined().to_string(), "Undefined");
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_display_includes_code_and_suggestion() {
            let e = TangentError::parse_error("unexpected ')'");
            let s = e.to_string();
            assert!(s.starts_with("[PARSE_ERROR]"));
            assert!(s.contains("suggestion"));
        }

        #[test]
        fn test_remote_errors_are_warnings() {
            assert_eq!(TangentError::remote_timeout("limit", 10).severity, Severity::Warning);
            assert_eq!(TangentError::remote_failure("boom").severity, Severity::Warning);
            assert_eq!(TangentError::internal("oops").severity, Severity::Fatal);
        }

        #[test]
        fn test_builders_accumulate_context() {
            let e = TangentError::domain_error("log of negative")
                .with_expression("log(x)")
                .with_note("at x = -1")
                .with_note("numeric stage");
            let ctx = e.context.unwrap();
            assert_eq!(ctx.expression.as_deref(), Some("log(x)"));
            assert_eq!(ctx.notes.len(), 2);
        }
    }
}
