//! Limit orchestration
//!
//! Directional limits come only from the symbolic engine. A bilateral
//! request is answered by asking for both sides concurrently and
//! classifying the pair locally.

use crate::engine::Tangent;
use crate::stages::{FallbackChain, StageOutcome};
use tangent_core::{Kind, Limit, Outcome, Provenance, TangentError};
use tangent_expr::CompiledExpr;
use tangent_numeric::{classify_bilateral, classify_one_sided, DirectionalLimit, Side};
use tangent_solver::{directional, LimitRequest, SolverError};

impl Tangent {
    /// Limit of `expr` (in `x`) as `x` approaches `a` from `side`
    pub async fn limit(&self, expr: &str, a: f64, side: Side) -> Outcome<Limit> {
        let chain = FallbackChain::new(Limit::NAME)
            .stage("engine", move || async move {
                let classified = match side {
                    Side::Both => {
                        let (left, right) = tokio::join!(self.one_side(expr, a, Side::Left), self.one_side(expr, a, Side::Right));
                        left.and_then(|l| right.map(|r| classify_bilateral(l, r)))
                    }
                    one => self.one_side(expr, a, one).await.map(classify_one_sided),
                };
                match classified {
                    Ok(outcome) => StageOutcome::Success(outcome.with_note(Provenance::SymbolicEngine)),
                    Err(e) => StageOutcome::Pass(Some(TangentError::from(e))),
                }
            })
            .stage("diagnose", move || async move {
                match CompiledExpr::compile(expr).error() {
                    Some(err) => StageOutcome::Exhausted(err.clone()),
                    None => StageOutcome::Pass(None),
                }
            });

        match chain.run().await {
            Ok(outcome) => outcome,
            Err(err) => Outcome::error(err.with_expression(expr)),
        }
    }

    async fn one_side(&self, expr: &str, a: f64, side: Side) -> Result<DirectionalLimit, SolverError> {
        let request = LimitRequest::new(expr, a, side);
        directional(self.limits.call_within(&request, self.config.limit_timeout()).await)
    }
}
