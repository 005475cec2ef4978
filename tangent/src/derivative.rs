//! Derivative orchestration
//!
//! Stages: local symbolic differentiation, the symbolic engine, then the
//! central-difference estimate. The locally derived text is computed up
//! front and fills in whichever result ships without one.

use crate::engine::Tangent;
use crate::stages::{FallbackChain, StageOutcome};
use tangent_core::{Derivative, Kind, Outcome, Provenance, TangentError};
use tangent_expr::CompiledExpr;
use tangent_numeric::numeric_derivative;
use tangent_solver::{DerivativeReply, DerivativeRequest};

impl Tangent {
    /// Derivative of `expr` with respect to `var` at `at`
    pub async fn derivative(&self, expr: &str, at: f64, var: &str) -> Outcome<Derivative> {
        let compiled = CompiledExpr::compile(expr);
        let local = compiled.derivative(var).filter(CompiledExpr::is_ok);
        let local_text = local.as_ref().map(|d| d.source().to_string());
        let (compiled, local, local_text) = (&compiled, &local, &local_text);

        let chain = FallbackChain::new(Derivative::NAME)
            .stage("symbolic", move || async move {
                if !self.config.local_symbolic {
                    return StageOutcome::Pass(None);
                }
                match local {
                    Some(d) => {
                        let outcome = Outcome::value(d.eval_at(var, at));
                        StageOutcome::Success(outcome.with_note(Provenance::Symbolic).with_expression(local_text.clone()))
                    }
                    None => StageOutcome::Pass(None),
                }
            })
            .stage("engine", move || async move {
                let request = DerivativeRequest::new(expr, at, var);
                match self.derivatives.call_within(&request, self.config.derivative_timeout()).await {
                    Ok(reply) => {
                        let text = reply.derivative_text();
                        let outcome = match reply {
                            DerivativeReply::Value { value, .. } => Outcome::value(value),
                            DerivativeReply::Undefined { .. } => Outcome::undefined(),
                        };
                        StageOutcome::Success(
                            outcome
                                .with_note(Provenance::SymbolicEngine)
                                .with_expression(text)
                                .or_expression(local_text.clone()),
                        )
                    }
                    Err(e) => StageOutcome::Pass(Some(TangentError::from(e))),
                }
            })
            .stage("numeric", move || async move {
                match compiled.error() {
                    Some(err) => StageOutcome::Exhausted(err.clone()),
                    None => StageOutcome::Success(numeric_derivative(compiled, var, at).or_expression(local_text.clone())),
                }
            });

        match chain.run().await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::error(err.with_expression(expr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{config, engine, offline};
    use crate::Tangent;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tangent_core::{codes, Provenance};
    use tangent_solver::{HandlerWorker, Scripted};

    fn remote_only(worker: HandlerWorker) -> Tangent {
        let config = crate::TangentConfig { local_symbolic: false, ..config() };
        Tangent::with_factory(config, Arc::new(worker))
    }

    #[tokio::test]
    async fn test_local_symbolic_is_authoritative() {
        let worker = HandlerWorker::new(|_, _| Scripted::ok(json!({ "kind": "value", "value": 0.0 })));
        let tangent = engine(worker.clone());
        let o = tangent.derivative("x^2", 3.0, "x").await;
        assert_eq!(o.as_value(), Some(6.0));
        assert_eq!(o.note(), Some(Provenance::Symbolic));
        assert_eq!(o.expression(), Some("2 * x"));
        assert_eq!(worker.spawn_count(), 0);
    }

    #[tokio::test]
    async fn test_reciprocal_at_zero_is_undefined() {
        let o = offline().derivative("1/x", 0.0, "x").await;
        assert!(o.is_undefined());
        assert_eq!(o.note(), Some(Provenance::Symbolic));
        assert!(o.expression().is_some());
    }

    #[tokio::test]
    async fn test_remote_text_wins() {
        let worker = HandlerWorker::new(|_, req| {
            let at = req["at"].as_f64().unwrap_or(f64::NAN);
            Scripted::ok(json!({ "kind": "value", "value": 2.0 * at, "derivative": "2*x" }))
        });
        let o = remote_only(worker.clone()).derivative("x^2", 3.0, "x").await;
        assert_eq!(o.as_value(), Some(6.0));
        assert_eq!(o.note(), Some(Provenance::SymbolicEngine));
        assert_eq!(o.expression(), Some("2*x"));
        assert_eq!(worker.requests()[0]["expr"], "x**2");
    }

    #[tokio::test]
    async fn test_local_text_fills_in_remote_result() {
        let worker = HandlerWorker::new(|_, _| Scripted::ok(json!({ "kind": "undefined" })));
        let o = remote_only(worker).derivative("x^2", 0.0, "x").await;
        assert!(o.is_undefined());
        assert_eq!(o.note(), Some(Provenance::SymbolicEngine));
        assert_eq!(o.expression(), Some("2 * x"));
    }

    #[tokio::test]
    async fn test_timeout_falls_through_to_numeric() {
        let worker = HandlerWorker::new(|_, _| {
            Scripted::ok(json!({ "kind": "value", "value": 0.0 })).after(Duration::from_secs(5))
        });
        let config = crate::TangentConfig { local_symbolic: false, derivative_timeout_ms: 20, ..config() };
        let tangent = Tangent::with_factory(config, Arc::new(worker));
        let o = tangent.derivative("x^2", 3.0, "x").await;
        assert!((o.as_value().unwrap() - 6.0).abs() < 1e-4);
        assert_eq!(o.note(), Some(Provenance::Numeric));
        assert_eq!(o.expression(), Some("2 * x"));
        assert_eq!(tangent.derivatives.pending_len().await, 1);
    }

    #[tokio::test]
    async fn test_no_local_rule_uses_numeric() {
        let o = offline().derivative("floor(x)", 0.5, "x").await;
        assert_eq!(o.as_value(), Some(0.0));
        assert_eq!(o.note(), Some(Provenance::Numeric));
        assert_eq!(o.expression(), None);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let o = offline().derivative("x +", 1.0, "x").await;
        let err = o.as_error().unwrap();
        assert!(err.is(codes::PARSE_ERROR));
        assert_eq!(err.context.as_ref().unwrap().capability.as_deref(), Some("derivative"));
    }

    #[tokio::test]
    async fn test_deep_nesting_is_reported_not_fatal() {
        let expr = format!("{}x{}", "(".repeat(10_000), ")".repeat(10_000));
        let o = offline().derivative(&expr, 1.0, "x").await;
        assert!(o.as_error().unwrap().is(codes::PARSE_ERROR));
    }
}
