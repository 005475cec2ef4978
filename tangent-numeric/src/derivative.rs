//! Central-difference derivative estimate

use tangent_core::{Derivative, Outcome, Provenance, TangentError};
use tangent_expr::{CompiledExpr, Univariate};

/// Step schedule, coarse to fine
pub const STEPS: [f64; 10] = [1e-1, 5e-2, 2e-2, 1e-2, 5e-3, 2e-3, 1e-3, 5e-4, 2e-4, 1e-4];

/// Number of trailing estimates that must agree
const WINDOW: usize = 4;

/// Estimate f'(a). Each probe is evaluated on its own, nothing is cached
/// across steps.
///
/// Fails with `INDETERMINATE` when fewer than four steps give finite
/// quotients and with `NUMERIC_INSTABILITY` when the last four disagree.
pub fn central_difference(f: impl Univariate, a: f64) -> Result<f64, TangentError> {
    let estimates: Vec<f64> = STEPS
        .iter()
        .filter_map(|&h| {
            let forward = f.at(a + h);
            let backward = f.at(a - h);
            if !forward.is_finite() || !backward.is_finite() {
                return None;
            }
            let q = (forward - backward) / (2.0 * h);
            q.is_finite().then_some(q)
        })
        .collect();

    if estimates.len() < WINDOW {
        return Err(TangentError::indeterminate(format!(
            "only {} of {} difference quotients are finite",
            estimates.len(),
            STEPS.len()
        )));
    }

    let recent = &estimates[estimates.len() - WINDOW..];
    let mean = recent.iter().sum::<f64>() / WINDOW as f64;
    let max = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = recent.iter().copied().fold(f64::INFINITY, f64::min);
    let spread = max - min;

    if spread <= tolerance(mean) {
        Ok(mean)
    } else {
        Err(TangentError::numeric_instability(spread))
    }
}

fn tolerance(mean: f64) -> f64 {
    f64::max(1e-6, 1e-4 * f64::max(1.0, mean.abs()))
}

/// Numeric derivative outcome of `expr` at `a`
///
/// Compile failures are errors. Instability and missing probes are
/// `undefined`, which is an answer rather than a failure.
pub fn numeric_derivative(expr: &CompiledExpr, var: &str, a: f64) -> Outcome<Derivative> {
    if let Some(err) = expr.error() {
        return Outcome::error(err.clone());
    }
    let outcome = match central_difference(expr.bind(var), a) {
        Ok(value) => Outcome::value(value),
        Err(err) => {
            tracing::debug!(expression = expr.source(), at = a, reason = %err, "numeric derivative undefined");
            Outcome::undefined()
        }
    };
    outcome.with_note(Provenance::Numeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tangent_core::codes;

    #[test]
    fn test_square_at_three() {
        let e = CompiledExpr::compile("x^2");
        let o = numeric_derivative(&e, "x", 3.0);
        assert!((o.as_value().unwrap() - 6.0).abs() < 1e-4);
        assert_eq!(o.note(), Some(Provenance::Numeric));
    }

    #[test]
    fn test_reciprocal_at_zero_is_undefined() {
        let e = CompiledExpr::compile("1/x");
        let o = numeric_derivative(&e, "x", 0.0);
        assert!(o.is_undefined());
        assert!(!o.is_error());
    }

    #[test]
    fn test_parse_error_is_error() {
        let e = CompiledExpr::compile("x +* 2");
        let o = numeric_derivative(&e, "x", 1.0);
        assert!(o.as_error().unwrap().is(codes::PARSE_ERROR));
    }

    #[test]
    fn test_sine() {
        let r = central_difference(|x: f64| x.sin(), 0.3).unwrap();
        assert!((r - 0.3f64.cos()).abs() < 1e-6);
    }

    #[test]
    fn test_too_few_finite_probes() {
        // Only the three finest steps stay inside the finite window
        let f = |x: f64| if x.abs() < 6e-4 { x } else { f64::NAN };
        let err = central_difference(f, 0.0).unwrap_err();
        assert!(err.is(codes::INDETERMINATE));
    }

    #[test]
    fn test_jump_is_unstable() {
        let step = |x: f64| if x < 0.0 { 0.0 } else { 1.0 };
        let err = central_difference(step, 0.0).unwrap_err();
        assert!(err.is(codes::NUMERIC_INSTABILITY));
    }

    #[test]
    fn test_probes_evaluated_per_step() {
        let calls = RefCell::new(Vec::new());
        let f = |x: f64| {
            calls.borrow_mut().push(x);
            x * x
        };
        central_difference(f, 1.0).unwrap();
        assert_eq!(calls.borrow().len(), 2 * STEPS.len());
    }
}
