use std::future::Future;
use std::io;
use std::time::Duration;

use dnsprobe_domain::DnsError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Lifetime control for a single query: an optional deadline plus a
/// cancellation token shared with the caller.
///
/// Cloning is cheap; clones observe the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    /// Shares an externally owned token, so the caller can cancel several
    /// queries at once.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fast-fails when the context is already cancelled. Runs before any
    /// I/O so a pre-cancelled query has no network effect.
    pub(crate) fn error(&self) -> Result<(), DnsError> {
        if self.is_cancelled() {
            Err(DnsError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Runs `fut` under this context. Cancellation wins with
    /// [`DnsError::Cancelled`]; deadline expiry surfaces as a timed-out I/O
    /// error, matching what a socket deadline would produce. Dropping the
    /// racing future tears down any socket or stream it owns, which is what
    /// unblocks pending reads and writes.
    pub(crate) async fn guard<T, F>(&self, fut: F) -> Result<T, DnsError>
    where
        F: Future<Output = Result<T, DnsError>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(DnsError::Cancelled),
            result = self.bounded(fut) => result,
        }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, DnsError>
    where
        F: Future<Output = Result<T, DnsError>>,
    {
        match self.deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                Ok(result) => result,
                Err(_) => Err(DnsError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "i/o timeout",
                ))),
            },
            None => fut.await,
        }
    }
}
