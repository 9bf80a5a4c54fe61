//! Completion waiter: polls a job's status with exponential, jittered backoff
//! until it reaches a terminal state, the caller cancels, or the attempt
//! budget runs out.
//!
//! The waiter owns no I/O. Status and result fetches go through [`JobApi`]
//! and cancellation through [`Cancellation`], so any backend (the HTTP
//! [`OcrClient`](crate::OcrClient), a test stub) can be driven by the same loop.

pub mod backoff;
pub mod cancel;

pub use backoff::{next_delay, Jitter, NoJitter, RandomJitter};
pub use cancel::{Cancellation, Deadline};

use crate::error::{OcrError, Result, TimeoutReason};
use crate::types::{JobState, JobStatus};
use std::time::Duration;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_secs(1);

/// Status and result fetches for a single job backend.
#[async_trait::async_trait]
pub trait JobApi: Send + Sync {
    /// Payload returned once a job completes; passed through untouched.
    type Output: Send;

    async fn get_status(&self, cancel: &dyn Cancellation, job_id: &str) -> Result<JobStatus>;

    async fn get_result(&self, cancel: &dyn Cancellation, job_id: &str) -> Result<Self::Output>;
}

/// Timing and retry knobs for one wait call.
///
/// Zero-valued fields mean "unset" and are replaced by [`WaitOptions::with_defaults`];
/// `max_attempts == 0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitOptions {
    /// Base delay after the first poll.
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor per iteration; `<= 0` (or NaN) falls back to the default.
    pub multiplier: f64,
    /// Exclusive upper bound of the random delay added to every sleep.
    pub max_jitter: Duration,
    pub max_attempts: u32,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_jitter: DEFAULT_MAX_JITTER,
            max_attempts: 0,
        }
    }
}

impl WaitOptions {
    /// All fields unset.
    pub fn unset() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 0.0,
            max_jitter: Duration::ZERO,
            max_attempts: 0,
        }
    }

    /// Returns a copy with every unset field filled in.
    pub fn with_defaults(self) -> Self {
        Self {
            initial_delay: non_zero_or(self.initial_delay, DEFAULT_INITIAL_DELAY),
            max_delay: non_zero_or(self.max_delay, DEFAULT_MAX_DELAY),
            multiplier: if self.multiplier > 0.0 {
                self.multiplier
            } else {
                DEFAULT_MULTIPLIER
            },
            max_jitter: non_zero_or(self.max_jitter, DEFAULT_MAX_JITTER),
            max_attempts: self.max_attempts,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

fn non_zero_or(value: Duration, default: Duration) -> Duration {
    if value.is_zero() {
        default
    } else {
        value
    }
}

/// What a single status snapshot means for the loop.
#[derive(Debug)]
enum Poll {
    Completed,
    Failed(OcrError),
    Pending,
}

fn interpret(status: JobStatus) -> Poll {
    match status.state {
        JobState::Completed => Poll::Completed,
        state if state.is_failure() => Poll::Failed(OcrError::JobFailed {
            job_id: status.id,
            state: state.to_string(),
            message: status.error.filter(|e| !e.is_empty()),
        }),
        _ => Poll::Pending,
    }
}

/// Waits for `job_id` with default options.
pub async fn wait_until_done<A>(
    api: &A,
    cancel: &dyn Cancellation,
    job_id: &str,
) -> Result<A::Output>
where
    A: JobApi + ?Sized,
{
    wait_until_done_with_options(api, cancel, job_id, WaitOptions::default()).await
}

/// Waits for `job_id`; unset fields of `options` take their defaults.
pub async fn wait_until_done_with_options<A>(
    api: &A,
    cancel: &dyn Cancellation,
    job_id: &str,
    options: WaitOptions,
) -> Result<A::Output>
where
    A: JobApi + ?Sized,
{
    let mut jitter = RandomJitter::new();
    wait_with_jitter(api, cancel, job_id, options, &mut jitter).await
}

/// The poll loop, with the jitter source supplied by the caller.
pub async fn wait_with_jitter<A, J>(
    api: &A,
    cancel: &dyn Cancellation,
    job_id: &str,
    options: WaitOptions,
    jitter: &mut J,
) -> Result<A::Output>
where
    A: JobApi + ?Sized,
    J: Jitter + ?Sized,
{
    let options = options.with_defaults();
    let mut delay = options.initial_delay;
    let mut attempts: u32 = 0;

    loop {
        if options.max_attempts > 0 && attempts >= options.max_attempts {
            return Err(OcrError::timeout(TimeoutReason::MaxAttempts { attempts }));
        }
        if cancel.is_triggered() {
            return Err(OcrError::timeout(cancel.reason()));
        }
        attempts += 1;

        let status = api.get_status(cancel, job_id).await?;
        match interpret(status) {
            Poll::Completed => return api.get_result(cancel, job_id).await,
            Poll::Failed(err) => return Err(err),
            Poll::Pending => {}
        }

        let sleep = delay.saturating_add(jitter.sample(options.max_jitter));
        if !cancel.wait_or_triggered(sleep).await {
            return Err(OcrError::timeout(cancel.reason()));
        }

        delay = next_delay(delay, options.multiplier, options.max_delay);
    }
}
