//! First of {future, timer}

use std::future::Future;
use std::time::Duration;

/// Wait for `fut` at most `budget`
///
/// `None` when the timer wins. The future is dropped at that point, but
/// work it handed off elsewhere (a request already sent to a worker) keeps
/// running.
pub async fn within<F: Future>(budget: Duration, fut: F) -> Option<F::Output> {
    tokio::time::timeout(budget, fut).await.ok()
}
