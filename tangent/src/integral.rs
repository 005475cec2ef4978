//! Integral orchestration
//!
//! The Simpson estimate is computed up front. When the symbolic engine
//! answers without a definite value the estimate backfills it; it never
//! overrides a value the engine did report.

use crate::engine::Tangent;
use crate::stages::{FallbackChain, StageOutcome};
use serde::Serialize;
use tangent_core::{Integral, Kind, Outcome, Provenance, TangentError};
use tangent_expr::CompiledExpr;
use tangent_numeric::numeric_integral;
use tangent_solver::IntegralRequest;

/// Symbolic antiderivative text
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Antiderivative {
    pub expression: String,
    pub note: Provenance,
}

impl Tangent {
    /// Definite integral of `expr` over `[lower, upper]`
    pub async fn integral(&self, expr: &str, lower: f64, upper: f64, var: &str) -> Outcome<Integral> {
        let compiled = CompiledExpr::compile(expr);
        let numeric = numeric_integral(&compiled, var, lower, upper);
        let compiled = &compiled;

        let chain = FallbackChain::new(Integral::NAME)
            .stage("engine", move || async move {
                if !(lower.is_finite() && upper.is_finite()) {
                    return StageOutcome::Pass(Some(TangentError::invalid_input("integration bounds must be finite")));
                }
                let request = IntegralRequest::definite(expr, var, lower, upper);
                match self.integrals.call_within(&request, self.config.integral_timeout()).await {
                    Ok(reply) => {
                        let outcome = match (reply.definite_value(), numeric) {
                            (Some(value), _) => Outcome::value(value).with_note(Provenance::SymbolicEngine),
                            (None, Some(value)) => Outcome::value(value).with_note(Provenance::Numeric),
                            (None, None) => Outcome::undefined().with_note(Provenance::SymbolicEngine),
                        };
                        StageOutcome::Success(outcome.with_expression(reply.indefinite_text()))
                    }
                    Err(e) => StageOutcome::Pass(Some(TangentError::from(e))),
                }
            })
            .stage("numeric", move || async move {
                if let Some(err) = compiled.error() {
                    return StageOutcome::Exhausted(err.clone());
                }
                match numeric {
                    Some(value) => StageOutcome::Success(Outcome::value(value).with_note(Provenance::Numeric)),
                    None => StageOutcome::Pass(Some(TangentError::domain_error(
                        "integrand is not finite across the interval",
                    ))),
                }
            });

        match chain.run().await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::error(err.with_expression(expr)),
        }
    }

    /// Symbolic antiderivative from the engine; there is no local fallback
    pub async fn antiderivative(&self, expr: &str, var: &str) -> Result<Antiderivative, TangentError> {
        let request = IntegralRequest::indefinite(expr, var);
        let reply = self
            .integrals
            .call_within(&request, self.config.integral_timeout())
            .await
            .map_err(|e| TangentError::from(e).in_capability(Integral::NAME).with_expression(expr))?;

        match reply.indefinite_text() {
            Some(expression) => Ok(Antiderivative { expression, note: Provenance::SymbolicEngine }),
            None => Err(TangentError::exhausted("the symbolic engine found no antiderivative")
                .in_capability(Integral::NAME)
                .with_expression(expr)),
        }
    }
}
