//! Caller-owned cancellation signals the waiter observes.

use crate::error::TimeoutReason;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Something that can stop a wait: a token, a deadline, or both.
#[async_trait::async_trait]
pub trait Cancellation: Send + Sync {
    /// Whether the signal has already fired.
    fn is_triggered(&self) -> bool;

    /// Resolves once the signal fires; never resolves if it cannot.
    async fn triggered(&self);

    /// Sleeps for `duration` unless the signal fires first.
    /// Returns `true` if the full duration elapsed.
    async fn wait_or_triggered(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.triggered() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// How a fired signal is reported to the caller.
    fn reason(&self) -> TimeoutReason {
        TimeoutReason::Cancelled
    }
}

#[async_trait::async_trait]
impl Cancellation for CancellationToken {
    fn is_triggered(&self) -> bool {
        self.is_cancelled()
    }

    async fn triggered(&self) {
        self.cancelled().await
    }
}

/// A cancellation token combined with an optional wall-clock deadline.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    token: CancellationToken,
    at: Option<Instant>,
}

impl Deadline {
    /// Fires only when `token` is cancelled.
    pub fn new(token: CancellationToken) -> Self {
        Self { token, at: None }
    }

    /// Fires when `token` is cancelled or `timeout` has passed, whichever is first.
    pub fn after(token: CancellationToken, timeout: Duration) -> Self {
        Self {
            token,
            at: Instant::now().checked_add(timeout),
        }
    }

    pub fn at(token: CancellationToken, at: Instant) -> Self {
        Self { token, at: Some(at) }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    fn elapsed(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }
}

#[async_trait::async_trait]
impl Cancellation for Deadline {
    fn is_triggered(&self) -> bool {
        self.token.is_cancelled() || self.elapsed()
    }

    async fn triggered(&self) {
        match self.at {
            Some(at) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(at) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    fn reason(&self) -> TimeoutReason {
        if !self.token.is_cancelled() && self.elapsed() {
            TimeoutReason::DeadlineElapsed
        } else {
            TimeoutReason::Cancelled
        }
    }
}
