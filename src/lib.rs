//! Client for a remote document-OCR service.
//!
//! Jobs are submitted with [`OcrClient::process_url`] and awaited with
//! [`OcrClient::wait_until_done`], which polls the job status with exponential,
//! jittered backoff until the job completes, fails, the caller cancels, or the
//! attempt budget is spent.
//!
//! ```no_run
//! # async fn run() -> ocr_waiter::Result<()> {
//! use ocr_waiter::{OcrClient, ProcessingOptions, WaitOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = OcrClient::with_api_key("your-api-key")?;
//! let job = client
//!     .process_url("https://example.com/invoice.pdf", &ProcessingOptions::default())
//!     .await?;
//!
//! let token = CancellationToken::new();
//! let options = WaitOptions::default().with_max_attempts(40);
//! let result = client.wait_until_done_with_options(&token, &job.id, options).await?;
//! println!("{}", result.text);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod waiter;

pub use client::OcrClient;
pub use config::ClientConfig;
pub use error::{ErrorKind, OcrError, Result, TimeoutReason};
pub use types::{Format, Job, JobState, JobStatus, OcrResult, PageResult, ProcessingOptions, Tier};
pub use waiter::{
    wait_until_done, wait_until_done_with_options, wait_with_jitter, Cancellation, Deadline,
    Jitter, JobApi, NoJitter, RandomJitter, WaitOptions,
};
