//! Symbolic engine workers
//!
//! A worker is anything that accepts request lines and produces reply
//! lines. `ProcessWorker` runs an external program speaking the protocol
//! over stdin/stdout. `HandlerWorker` answers in-process from a closure and
//! is what the test suites script the engine with.

use crate::error::SolverError;
use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

const CHANNEL_CAPACITY: usize = 64;

/// Both ends of a live worker
pub struct WorkerLink {
    /// Request lines to the worker
    pub outbox: mpsc::Sender<String>,
    /// Reply lines from the worker. Closes when the worker dies.
    pub inbox: mpsc::Receiver<String>,
}

/// Starts one worker for a capability
#[async_trait]
pub trait WorkerFactory: Send + Sync {
    async fn spawn(&self, capability: &'static str) -> Result<WorkerLink, SolverError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

// ============================================================================
// External process
// ============================================================================

/// External program, one process per capability
///
/// The capability name is appended as the last argument.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    command: String,
    args: Vec<String>,
}

impl ProcessWorker {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self { command: command.into(), args }
    }
}

#[async_trait]
impl WorkerFactory for ProcessWorker {
    async fn spawn(&self, capability: &'static str) -> Result<WorkerLink, SolverError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(capability)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SolverError::WorkerClosed("stdin not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SolverError::WorkerClosed("stdout not captured".to_string()))?;

        tracing::info!(command = %self.command, capability, pid = ?child.id(), "symbolic worker started");

        let (outbox, mut requests) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (replies, inbox) = mpsc::channel::<String>(CHANNEL_CAPACITY);

        tokio::spawn(async move {
            while let Some(line) = requests.recv().await {
                let written = async {
                    stdin.write_all(line.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.flush().await
                }
                .await;
                if let Err(e) = written {
                    tracing::warn!(capability, error = %e, "write to symbolic worker failed");
                    break;
                }
            }
            // Dropping stdin tells the worker to exit
        });

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            if line.trim().is_empty() {
                                continue;
                            }
                            if replies.send(line).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            tracing::debug!(capability, "symbolic worker stdout closed");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(capability, error = %e, "read from symbolic worker failed");
                            break;
                        }
                    },
                    _ = replies.closed() => break,
                }
            }
            if let Err(e) = child.kill().await {
                tracing::debug!(capability, error = %e, "symbolic worker already gone");
            }
        });

        Ok(WorkerLink { outbox, inbox })
    }

    fn describe(&self) -> String {
        format!("process `{}`", self.command)
    }
}

// ============================================================================
// Unavailable engine
// ============================================================================

/// No engine configured: every spawn fails
#[derive(Debug, Clone, Default)]
pub struct Unavailable;

#[async_trait]
impl WorkerFactory for Unavailable {
    async fn spawn(&self, _capability: &'static str) -> Result<WorkerLink, SolverError> {
        Err(SolverError::Unavailable("no solver command configured".to_string()))
    }

    fn describe(&self) -> String {
        "unavailable".to_string()
    }
}

// ============================================================================
// In-process handler
// ============================================================================

/// What a scripted worker does with one request
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Send `body` (its `id` is filled in) after `delay`
    Answer { body: Value, delay: Duration },
    /// Never answer
    Ignore,
    /// Close the worker's output, as if the process died
    Crash,
}

impl Scripted {
    /// Successful reply with the given fields
    pub fn ok(fields: Value) -> Self {
        let mut body = match fields {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        body.insert("ok".to_string(), Value::Bool(true));
        Scripted::Answer { body: Value::Object(body), delay: Duration::ZERO }
    }

    /// Failed reply with the given error text
    pub fn fail(error: impl Into<String>) -> Self {
        Scripted::Answer {
            body: serde_json::json!({ "ok": false, "error": error.into() }),
            delay: Duration::ZERO,
        }
    }

    /// Delay an answer
    pub fn after(self, delay: Duration) -> Self {
        match self {
            Scripted::Answer { body, .. } => Scripted::Answer { body, delay },
            other => other,
        }
    }
}

type Handler = dyn Fn(&'static str, &Value) -> Scripted + Send + Sync;

/// Worker answering from a closure, inside this process
///
/// Each request is answered from its own task, so a slow answer never
/// holds back a fast one.
#[derive(Clone)]
pub struct HandlerWorker {
    handler: Arc<Handler>,
    spawned: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Value>>>,
}

impl HandlerWorker {
    pub fn new(handler: impl Fn(&'static str, &Value) -> Scripted + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
            spawned: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// How many workers this factory has started
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<Value> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl WorkerFactory for HandlerWorker {
    async fn spawn(&self, capability: &'static str) -> Result<WorkerLink, SolverError> {
        self.spawned.fetch_add(1, Ordering::SeqCst);

        let (outbox, mut requests) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (replies, inbox) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let handler = Arc::clone(&self.handler);
        let seen = Arc::clone(&self.seen);

        tokio::spawn(async move {
            while let Some(line) = requests.recv().await {
                let request: Value = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(capability, error = %e, "handler worker got malformed request");
                        continue;
                    }
                };
                if let Ok(mut seen) = seen.lock() {
                    seen.push(request.clone());
                }
                let id = request.get("id").cloned().unwrap_or(Value::Null);

                match handler(capability, &request) {
                    Scripted::Answer { mut body, delay } => {
                        if let Value::Object(map) = &mut body {
                            map.insert("id".to_string(), id);
                        }
                        // Weak, so a crash closes the inbox with answers still pending
                        let replies = replies.downgrade();
                        tokio::spawn(async move {
                            if !delay.is_zero() {
                                tokio::time::sleep(delay).await;
                            }
                            if let Some(replies) = replies.upgrade() {
                                let _ = replies.send(body.to_string()).await;
                            }
                        });
                    }
                    Scripted::Ignore => {}
                    Scripted::Crash => {
                        tracing::debug!(capability, "handler worker crashing on request");
                        break;
                    }
                }
            }
        });

        Ok(WorkerLink { outbox, inbox })
    }

    fn describe(&self) -> String {
        "in-process handler".to_string()
    }
}
