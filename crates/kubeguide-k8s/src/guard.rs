//! Deadline and cancellation for cluster calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Interrupted;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounds every discovery and fetch call with a timeout and a shared
/// cancellation token.
#[derive(Clone, Debug)]
pub struct RequestGuard {
    timeout: Duration,
    cancel: CancellationToken,
}

impl RequestGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an existing token, e.g. the application's shutdown token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drive `fut` until it completes, the timeout elapses or the token fires.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Interrupted>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            out = tokio::time::timeout(self.timeout, fut) => {
                out.map_err(|_| Interrupted::Timeout(self.timeout))
            }
        }
    }
}

impl Default for RequestGuard {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}
