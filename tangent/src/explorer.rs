//! Interactive exploration session
//!
//! An `Explorer` is what a front end talks to. Each capability keeps its
//! newest committed outcome behind a generation gate, so a slow answer to
//! an old input can never overwrite the answer to a newer one.

use crate::engine::Tangent;
use crate::generation::{GenerationGate, Ticket};
use crate::resample::{PlotRequest, PlotResult, Resampler};
use std::sync::Arc;
use tangent_core::{Derivative, Integral, Kind, Limit, Outcome};
use tangent_numeric::Side;
use tokio::sync::watch;

struct Slot<K: Kind> {
    gate: GenerationGate,
    latest: watch::Sender<Option<Outcome<K>>>,
}

impl<K: Kind> Slot<K> {
    fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self { gate: GenerationGate::new(), latest }
    }

    fn commit(&self, ticket: Ticket, outcome: Outcome<K>) -> Option<Outcome<K>> {
        if !self.gate.is_current(ticket) {
            tracing::debug!(
                capability = K::NAME,
                generation = ticket.generation(),
                current = self.gate.current(),
                "stale result discarded"
            );
            return None;
        }
        self.latest.send_replace(Some(outcome.clone()));
        Some(outcome)
    }
}

pub struct Explorer {
    engine: Arc<Tangent>,
    limits: Slot<Limit>,
    derivatives: Slot<Derivative>,
    integrals: Slot<Integral>,
    resampler: Resampler,
}

impl Explorer {
    pub fn new(engine: Arc<Tangent>) -> Self {
        let resampler = Resampler::new(engine.config().frame());
        Self {
            engine,
            limits: Slot::new(),
            derivatives: Slot::new(),
            integrals: Slot::new(),
            resampler,
        }
    }

    pub fn engine(&self) -> &Arc<Tangent> {
        &self.engine
    }

    /// Compute a limit; `None` if a newer limit request was issued meanwhile
    pub async fn limit(&self, expr: &str, a: f64, side: Side) -> Option<Outcome<Limit>> {
        let ticket = self.limits.gate.begin();
        let outcome = self.engine.limit(expr, a, side).await;
        self.limits.commit(ticket, outcome)
    }

    pub async fn derivative(&self, expr: &str, at: f64, var: &str) -> Option<Outcome<Derivative>> {
        let ticket = self.derivatives.gate.begin();
        let outcome = self.engine.derivative(expr, at, var).await;
        self.derivatives.commit(ticket, outcome)
    }

    pub async fn integral(&self, expr: &str, lower: f64, upper: f64, var: &str) -> Option<Outcome<Integral>> {
        let ticket = self.integrals.gate.begin();
        let outcome = self.engine.integral(expr, lower, upper, var).await;
        self.integrals.commit(ticket, outcome)
    }

    /// Schedule a plot on the next frame tick
    pub fn plot(&self, request: PlotRequest) {
        self.resampler.schedule(request);
    }

    pub fn latest_limit(&self) -> Option<Outcome<Limit>> {
        self.limits.latest.borrow().clone()
    }

    pub fn latest_derivative(&self) -> Option<Outcome<Derivative>> {
        self.derivatives.latest.borrow().clone()
    }

    pub fn latest_integral(&self) -> Option<Outcome<Integral>> {
        self.integrals.latest.borrow().clone()
    }

    pub fn latest_plot(&self) -> Option<PlotResult> {
        self.resampler.latest()
    }

    pub fn subscribe_limit(&self) -> watch::Receiver<Option<Outcome<Limit>>> {
        self.limits.latest.subscribe()
    }

    pub fn subscribe_derivative(&self) -> watch::Receiver<Option<Outcome<Derivative>>> {
        self.derivatives.latest.subscribe()
    }

    pub fn subscribe_integral(&self) -> watch::Receiver<Option<Outcome<Integral>>> {
        self.integrals.latest.subscribe()
    }

    pub fn subscribe_plot(&self) -> watch::Receiver<Option<PlotResult>> {
        self.resampler.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine, offline};
    use serde_json::json;
    use std::time::Duration;
    use tangent_numeric::Viewport;
    use tangent_solver::{HandlerWorker, Scripted};

    /// Echoes the approach point back, slowly for points below 1
    fn echo_limits() -> HandlerWorker {
        HandlerWorker::new(|_, req| {
            let a = req["a"].as_f64().unwrap_or(0.0);
            let delay = if a < 1.0 { 80 } else { 0 };
            Scripted::ok(json!({ "kind": "value", "value": a })).after(Duration::from_millis(delay))
        })
    }

    #[tokio::test]
    async fn test_superseding_request_commits_even_when_first_arrives_last() {
        let explorer = Explorer::new(Arc::new(engine(echo_limits())));
        let mut updates = explorer.subscribe_limit();

        let (old, new) = tokio::join!(
            explorer.limit("x", 0.0, Side::Right),
            explorer.limit("x", 5.0, Side::Right)
        );
        assert_eq!(old, None);
        assert_eq!(new.unwrap().as_value(), Some(5.0));
        assert_eq!(explorer.latest_limit().unwrap().as_value(), Some(5.0));

        assert!(updates.has_changed().unwrap());
        assert_eq!(updates.borrow_and_update().as_ref().unwrap().as_value(), Some(5.0));
    }

    #[tokio::test]
    async fn test_capabilities_are_independent() {
        let explorer = Explorer::new(Arc::new(offline()));
        let d = explorer.derivative("x^2", 3.0, "x").await.unwrap();
        let i = explorer.integral("x^2", 0.0, 1.0, "x").await.unwrap();
        assert_eq!(d.as_value(), Some(6.0));
        assert!((i.as_value().unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert!(explorer.latest_limit().is_none());
        assert_eq!(explorer.latest_derivative(), Some(d));
        assert_eq!(explorer.latest_integral(), Some(i));
    }

    #[tokio::test]
    async fn test_subscribers_see_their_own_capability() {
        let explorer = Explorer::new(Arc::new(offline()));
        let mut derivatives = explorer.subscribe_derivative();
        let mut integrals = explorer.subscribe_integral();

        explorer.derivative("x^2", 1.0, "x").await.unwrap();
        assert!(derivatives.has_changed().unwrap());
        assert!(!integrals.has_changed().unwrap());
        assert_eq!(derivatives.borrow_and_update().as_ref().unwrap().as_value(), Some(2.0));

        explorer.integral("2x", 0.0, 3.0, "x").await.unwrap();
        assert!(integrals.has_changed().unwrap());
        let area = integrals.borrow_and_update().as_ref().unwrap().as_value().unwrap();
        assert!((area - 9.0).abs() < 1e-9);
        assert!(!derivatives.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_plot_through_explorer() {
        let explorer = Explorer::new(Arc::new(offline()));
        let mut frames = explorer.subscribe_plot();
        explorer.plot(PlotRequest::new("x^3", Viewport::around(0.0), 800));
        frames.changed().await.unwrap();
        let frame = explorer.latest_plot().unwrap().unwrap();
        assert_eq!(frame.sampling.segments.len(), 1);
        assert!(frame.merged_asymptotes.is_empty());
    }
}
