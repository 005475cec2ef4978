//! Ordered fallback stages
//!
//! Each capability runs a short list of stages and stops at the first one
//! that produces an answer. A stage either succeeds, passes to the next
//! one (optionally saying why) or ends the chain with an error.

use std::future::Future;
use std::pin::Pin;
use tangent_core::TangentError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug)]
pub enum StageOutcome<T> {
    Success(T),
    /// Nothing from this stage; try the next one
    Pass(Option<TangentError>),
    /// Stop here with this error
    Exhausted(TangentError),
}

type StageFn<'a, T> = Box<dyn FnOnce() -> BoxFuture<'a, StageOutcome<T>> + Send + 'a>;

pub struct FallbackChain<'a, T> {
    capability: &'static str,
    stages: Vec<(&'static str, StageFn<'a, T>)>,
}

impl<'a, T: Send + 'a> FallbackChain<'a, T> {
    pub fn new(capability: &'static str) -> Self {
        Self { capability, stages: Vec::new() }
    }

    /// Builder: append a stage. Stages run lazily, in insertion order.
    pub fn stage<F, Fut>(mut self, name: &'static str, stage: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = StageOutcome<T>> + Send + 'a,
    {
        self.stages.push((name, Box::new(move || Box::pin(stage()) as BoxFuture<'a, StageOutcome<T>>)));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub async fn run(self) -> Result<T, TangentError> {
        let capability = self.capability;
        let mut causes = Vec::new();

        for (name, stage) in self.stages {
            match stage().await {
                StageOutcome::Success(value) => {
                    tracing::debug!(capability, stage = name, "stage succeeded");
                    return Ok(value);
                }
                StageOutcome::Pass(cause) => {
                    match &cause {
                        Some(cause) => tracing::debug!(capability, stage = name, %cause, "stage passed"),
                        None => tracing::debug!(capability, stage = name, "stage passed"),
                    }
                    causes.extend(cause.map(|c| format!("{}: {}", name, c.message)));
                }
                StageOutcome::Exhausted(err) => {
                    tracing::debug!(capability, stage = name, error = %err, "stage ended the chain");
                    return Err(err);
                }
            }
        }

        let err = TangentError::exhausted(format!("no method produced a {}", capability));
        Err(causes.into_iter().fold(err, TangentError::with_note))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tangent_core::codes;

    #[tokio::test]
    async fn test_first_success_wins() {
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result = FallbackChain::new("limit")
            .stage("first", || async { StageOutcome::Pass(None) })
            .stage("second", || async { StageOutcome::Success(2) })
            .stage("third", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                StageOutcome::Success(3)
            })
            .run()
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_exhausted_stops_chain() {
        let result: Result<i32, _> = FallbackChain::new("integral")
            .stage("parse", || async { StageOutcome::Exhausted(TangentError::parse_error("bad")) })
            .stage("never", || async { StageOutcome::Success(1) })
            .run()
            .await;
        assert!(result.unwrap_err().is(codes::PARSE_ERROR));
    }

    #[tokio::test]
    async fn test_all_pass_collects_causes() {
        let chain: FallbackChain<'_, i32> = FallbackChain::new("derivative")
            .stage("remote", || async { StageOutcome::Pass(Some(TangentError::remote_timeout("derivative", 5))) })
            .stage("numeric", || async { StageOutcome::Pass(None) });
        assert_eq!(chain.len(), 2);

        let err = chain.run().await.unwrap_err();
        assert!(err.is(codes::EXHAUSTED));
        let notes = err.context.unwrap().notes;
        assert_eq!(notes.len(), 1);
        assert!(notes[0].starts_with("remote: "));
    }
}
