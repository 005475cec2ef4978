//! Per-capability symbolic engine client
//!
//! The client owns at most one worker, started lazily on the first call.
//! A dispatcher task owns the pending table and the id counter: requests
//! and replies both pass through it, so the table needs no lock.

use crate::error::SolverError;
use crate::protocol::{self, Capability};
use crate::race::within;
use crate::worker::{WorkerFactory, WorkerLink};
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, OnceCell};

type Completion = oneshot::Sender<Result<Value, SolverError>>;

enum Command {
    Send { payload: Value, done: Completion },
    PendingLen(oneshot::Sender<usize>),
    Shutdown,
}

/// Message-passing client for one capability of the symbolic engine
pub struct SymbolicEngineClient<C: Capability> {
    factory: Arc<dyn WorkerFactory>,
    commands: OnceCell<mpsc::Sender<Command>>,
    capability: PhantomData<C>,
}

impl<C: Capability> SymbolicEngineClient<C> {
    pub fn new(factory: Arc<dyn WorkerFactory>) -> Self {
        Self { factory, commands: OnceCell::new(), capability: PhantomData }
    }

    async fn commands(&self) -> Result<&mpsc::Sender<Command>, SolverError> {
        self.commands
            .get_or_try_init(|| async {
                let link = self.factory.spawn(C::NAME).await.map_err(|e| {
                    tracing::debug!(capability = C::NAME, engine = %self.factory.describe(), error = %e, "worker not started");
                    e
                })?;
                let (tx, rx) = mpsc::channel(64);
                tokio::spawn(dispatch(C::NAME, rx, link));
                Ok::<_, SolverError>(tx)
            })
            .await
    }

    /// Send one request and wait for its reply
    pub async fn call(&self, request: &C::Request) -> Result<C::Reply, SolverError> {
        let commands = self.commands().await?;
        let payload = serde_json::to_value(request)?;

        let (done, completion) = oneshot::channel();
        commands
            .send(Command::Send { payload, done })
            .await
            .map_err(|_| closed())?;

        let body = completion.await.map_err(|_| closed())??;
        protocol::reply::<C>(body)
    }

    /// `call` bounded by `budget`; the request itself is not cancelled
    pub async fn call_within(&self, request: &C::Request, budget: Duration) -> Result<C::Reply, SolverError> {
        match within(budget, self.call(request)).await {
            Some(result) => result,
            None => {
                let millis = budget.as_millis() as u64;
                tracing::warn!(capability = C::NAME, millis, "symbolic engine timed out");
                Err(SolverError::Timeout { capability: C::NAME, millis })
            }
        }
    }

    /// Requests sent but not yet answered
    pub async fn pending_len(&self) -> usize {
        let Some(commands) = self.commands.get() else {
            return 0;
        };
        let (tx, rx) = oneshot::channel();
        if commands.send(Command::PendingLen(tx)).await.is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }

    pub fn is_started(&self) -> bool {
        self.commands.initialized()
    }

    /// Stop the worker, rejecting everything still pending
    pub async fn shutdown(&self) {
        if let Some(commands) = self.commands.get() {
            let _ = commands.send(Command::Shutdown).await;
        }
    }
}

fn closed() -> SolverError {
    SolverError::WorkerClosed("dispatcher stopped".to_string())
}

fn reject_all(capability: &'static str, pending: &mut HashMap<u64, Completion>, reason: &str) {
    if !pending.is_empty() {
        tracing::info!(capability, count = pending.len(), reason, "rejecting pending requests");
    }
    for (_, done) in pending.drain() {
        let _ = done.send(Err(SolverError::WorkerClosed(reason.to_string())));
    }
}

async fn dispatch(capability: &'static str, mut commands: mpsc::Receiver<Command>, link: WorkerLink) {
    let WorkerLink { outbox, mut inbox } = link;
    let mut pending: HashMap<u64, Completion> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send { payload, done }) => {
                    let id = next_id;
                    next_id += 1;
                    let line = match protocol::encode(id, &payload) {
                        Ok(line) => line,
                        Err(e) => {
                            let _ = done.send(Err(e));
                            continue;
                        }
                    };
                    if outbox.send(line).await.is_err() {
                        let _ = done.send(Err(SolverError::WorkerClosed("worker input closed".to_string())));
                        continue;
                    }
                    tracing::trace!(capability, id, "request sent");
                    // Callers that timed out dropped their receivers
                    let before = pending.len();
                    pending.retain(|_, waiting| !waiting.is_closed());
                    if pending.len() < before {
                        tracing::debug!(capability, count = before - pending.len(), "abandoned requests pruned");
                    }
                    pending.insert(id, done);
                }
                Some(Command::PendingLen(tx)) => {
                    let _ = tx.send(pending.len());
                }
                Some(Command::Shutdown) => {
                    reject_all(capability, &mut pending, "shut down");
                    tracing::info!(capability, "symbolic worker shut down");
                    break;
                }
                None => {
                    reject_all(capability, &mut pending, "client dropped");
                    break;
                }
            },
            line = inbox.recv() => match line {
                Some(line) => match protocol::decode(&line) {
                    Ok(envelope) => match pending.remove(&envelope.id) {
                        Some(done) => {
                            if done.send(envelope.body).is_err() {
                                tracing::debug!(capability, id = envelope.id, "late reply dropped");
                            }
                        }
                        None => tracing::debug!(capability, id = envelope.id, "reply for unknown request"),
                    },
                    Err(e) => tracing::warn!(capability, error = %e, "undecodable reply"),
                },
                None => {
                    tracing::warn!(capability, "symbolic worker exited");
                    reject_all(capability, &mut pending, "worker exited");
                    break;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DerivativeRequest, DerivativeReply, LimitRequest};
    use crate::worker::{HandlerWorker, Scripted, Unavailable};
    use serde_json::json;
    use tangent_core::{Derivative, Limit};
    use tangent_numeric::Side;

    fn square_derivative() -> HandlerWorker {
        HandlerWorker::new(|_, req| {
            let at = req["at"].as_f64().unwrap_or(f64::NAN);
            Scripted::ok(json!({ "kind": "value", "value": 2.0 * at, "derivative": "2*x" }))
        })
    }

    #[tokio::test]
    async fn test_call_roundtrip() {
        let client = SymbolicEngineClient::<Derivative>::new(Arc::new(square_derivative()));
        let reply = client.call(&DerivativeRequest::new("x^2", 3.0, "x")).await.unwrap();
        assert_eq!(reply, DerivativeReply::Value { value: 6.0, derivative: Some("2*x".into()) });
        assert_eq!(client.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_worker_started_lazily_once() {
        let worker = square_derivative();
        let client = SymbolicEngineClient::<Derivative>::new(Arc::new(worker.clone()));
        assert!(!client.is_started());
        assert_eq!(worker.spawn_count(), 0);

        for at in [1.0, 2.0, 3.0] {
            client.call(&DerivativeRequest::new("x^2", at, "x")).await.unwrap();
        }
        assert!(client.is_started());
        assert_eq!(worker.spawn_count(), 1);

        let ids: Vec<u64> = worker.requests().iter().filter_map(|r| r["id"].as_u64()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_replies_matched_by_id_out_of_order() {
        let worker = HandlerWorker::new(|_, req| {
            let a = req["a"].as_f64().unwrap_or(0.0);
            let delay = if a < 1.0 { 50 } else { 0 };
            Scripted::ok(json!({ "kind": "value", "value": a })).after(Duration::from_millis(delay))
        });
        let client = SymbolicEngineClient::<Limit>::new(Arc::new(worker));
        let slow = LimitRequest::new("x", 0.0, Side::Both);
        let fast = LimitRequest::new("x", 5.0, Side::Both);
        let (s, f) = tokio::join!(client.call(&slow), client.call(&fast));
        assert_eq!(s.unwrap(), crate::protocol::LimitReply::Value { value: 0.0 });
        assert_eq!(f.unwrap(), crate::protocol::LimitReply::Value { value: 5.0 });
    }

    #[tokio::test]
    async fn test_remote_error() {
        let worker = HandlerWorker::new(|_, _| Scripted::fail("could not differentiate"));
        let client = SymbolicEngineClient::<Derivative>::new(Arc::new(worker));
        let err = client.call(&DerivativeRequest::new("x", 0.0, "x")).await.unwrap_err();
        assert!(matches!(err, SolverError::Remote(ref m) if m == "could not differentiate"));
    }

    #[tokio::test]
    async fn test_timeout_leaves_request_pending_then_drops_late_reply() {
        let worker = HandlerWorker::new(|_, _| {
            Scripted::ok(json!({ "kind": "undefined" })).after(Duration::from_millis(60))
        });
        let client = SymbolicEngineClient::<Derivative>::new(Arc::new(worker));
        let req = DerivativeRequest::new("x", 0.0, "x");

        let err = client.call_within(&req, Duration::from_millis(5)).await.unwrap_err();
        assert!(matches!(err, SolverError::Timeout { capability: "derivative", millis: 5 }));
        assert_eq!(client.pending_len().await, 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(client.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_hung_engine_does_not_accumulate_abandoned_requests() {
        let client = SymbolicEngineClient::<Derivative>::new(Arc::new(HandlerWorker::new(|_, _| Scripted::Ignore)));
        for at in 0..5 {
            let req = DerivativeRequest::new("x", at as f64, "x");
            let err = client.call_within(&req, Duration::from_millis(5)).await.unwrap_err();
            assert!(matches!(err, SolverError::Timeout { .. }));
        }
        assert_eq!(client.pending_len().await, 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_pending() {
        let client = Arc::new(SymbolicEngineClient::<Derivative>::new(Arc::new(HandlerWorker::new(
            |_, _| Scripted::Ignore,
        ))));
        let waiting = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.call(&DerivativeRequest::new("x", 0.0, "x")).await })
        };
        while client.pending_len().await == 0 {
            tokio::task::yield_now().await;
        }
        client.shutdown().await;
        let err = waiting.await.unwrap().unwrap_err();
        assert!(matches!(err, SolverError::WorkerClosed(ref r) if r == "shut down"));
    }

    #[tokio::test]
    async fn test_worker_death_rejects_pending() {
        let worker = HandlerWorker::new(|_, req| {
            if req["at"].as_f64() == Some(1.0) {
                Scripted::Crash
            } else {
                Scripted::Ignore
            }
        });
        let client = Arc::new(SymbolicEngineClient::<Derivative>::new(Arc::new(worker)));
        let first = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.call(&DerivativeRequest::new("x", 0.0, "x")).await })
        };
        while client.pending_len().await == 0 {
            tokio::task::yield_now().await;
        }
        let second = client.call(&DerivativeRequest::new("x", 1.0, "x")).await;
        assert!(matches!(second, Err(SolverError::WorkerClosed(_))));
        assert!(matches!(first.await.unwrap(), Err(SolverError::WorkerClosed(_))));
    }

    #[tokio::test]
    async fn test_unavailable_engine() {
        let client = SymbolicEngineClient::<Derivative>::new(Arc::new(Unavailable));
        let err = client.call(&DerivativeRequest::new("x", 0.0, "x")).await.unwrap_err();
        assert!(matches!(err, SolverError::Unavailable(_)));
        assert!(!client.is_started());
        assert_eq!(client.pending_len().await, 0);
    }
}
