//! Deadline: run-scoped cancellation threaded through every suspending call.
//!
//! A [`Deadline`] combines an optional expiry instant with a
//! [`CancellationToken`]. Clones share the same token, so cancelling any
//! clone (user interrupt) stops every in-flight source and provider call.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancelled {
    #[error("run deadline expired")]
    Expired,
    #[error("run cancelled")]
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Option<Instant>,
    token: CancellationToken,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Some(Instant::now() + timeout),
            token: CancellationToken::new(),
        }
    }

    /// No expiry; only explicit cancellation ends it.
    pub fn unbounded() -> Self {
        Self {
            expires_at: None,
            token: CancellationToken::new(),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left before expiry. `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Drive `fut` until it completes, the deadline expires, or the run is
    /// cancelled. On expiry or cancellation `fut` is dropped, which releases
    /// whatever connection it owns.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        if self.token.is_cancelled() {
            return Err(Cancelled::Interrupted);
        }

        let expiry = async {
            match self.expires_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(Cancelled::Interrupted),
            _ = expiry => Err(Cancelled::Expired),
            out = fut => Ok(out),
        }
    }

    /// Sleep for `dur`, cut short by cancellation or expiry.
    pub async fn sleep(&self, dur: Duration) -> Result<(), Cancelled> {
        self.run(tokio::time::sleep(dur)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_before_expiry() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let out = deadline.run(async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn test_expiry_interrupts_slow_future() {
        let deadline = Deadline::after(Duration::from_millis(20));
        let started = std::time::Instant::now();
        let out = deadline
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert_eq!(out, Err(Cancelled::Expired));
        assert!(started.elapsed() < Duration::from_secs(5), "must not block past deadline");
        assert!(deadline.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_is_shared_between_clones() {
        let deadline = Deadline::unbounded();
        let clone = deadline.clone();

        let waiter = tokio::spawn(async move {
            clone.run(std::future::pending::<()>()).await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        deadline.cancel();

        let out = waiter.await.expect("task panicked");
        assert_eq!(out, Err(Cancelled::Interrupted));
    }

    #[tokio::test]
    async fn test_already_cancelled_short_circuits() {
        let deadline = Deadline::unbounded();
        deadline.cancel();
        assert_eq!(deadline.run(async { 1 }).await, Err(Cancelled::Interrupted));
    }

    #[test]
    fn test_unbounded_has_no_remaining() {
        assert_eq!(Deadline::unbounded().remaining(), None);
    }
}
