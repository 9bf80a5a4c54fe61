//! Error taxonomy for the OCR client and the completion waiter.

use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OcrError>;

/// Which budget stopped a wait call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutReason {
    /// `max_attempts` status polls were issued without reaching a terminal state.
    MaxAttempts { attempts: u32 },
    /// The caller's cancellation token fired.
    Cancelled,
    /// The caller's wall-clock deadline passed.
    DeadlineElapsed,
}

impl fmt::Display for TimeoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxAttempts { attempts } => {
                write!(f, "maximum polling attempts exceeded ({attempts})")
            }
            Self::Cancelled => write!(f, "cancelled while waiting for completion"),
            Self::DeadlineElapsed => write!(f, "deadline elapsed while waiting for completion"),
        }
    }
}

/// Coarse classification of an [`OcrError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    JobFailure,
    Api,
    Http,
    Decode,
    InvalidConfig,
}

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("timeout: {reason}")]
    Timeout { reason: TimeoutReason },

    /// The remote service reported the job as failed, errored or canceled.
    #[error("job {job_id} ended in state '{state}'{}", detail_suffix(.message))]
    JobFailed {
        job_id: String,
        state: String,
        message: Option<String>,
    },

    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

fn detail_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(": {m}"),
        _ => String::new(),
    }
}

impl OcrError {
    pub fn timeout(reason: TimeoutReason) -> Self {
        Self::Timeout { reason }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::JobFailed { .. } => ErrorKind::JobFailure,
            Self::Api { .. } => ErrorKind::Api,
            Self::Http(_) => ErrorKind::Http,
            Self::Decode(_) => ErrorKind::Decode,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    pub fn is_job_failure(&self) -> bool {
        self.kind() == ErrorKind::JobFailure
    }

    /// The budget that fired, if this is a timeout.
    pub fn timeout_reason(&self) -> Option<TimeoutReason> {
        match self {
            Self::Timeout { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Whether an outer caller could reasonably retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => !e.is_builder() && !e.is_decode(),
            Self::Api { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
