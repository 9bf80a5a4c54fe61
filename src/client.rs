//! HTTP client for the OCR job API.
//!
//! Provides the status and result fetches the completion waiter polls, plus
//! remote-URL submission and job deletion.

use crate::config::ClientConfig;
use crate::error::{OcrError, Result};
use crate::types::{Job, JobState, JobStatus, OcrResult, PageResult, ProcessingOptions};
use crate::waiter::{self, Cancellation, JobApi, WaitOptions};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// OCR API client.
#[derive(Clone)]
pub struct OcrClient {
    client: Client,
    config: ClientConfig,
}

impl OcrClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    /// Client with default settings for `api_key`.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(api_key))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Base URL with `segments` appended, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            OcrError::InvalidConfig(format!("invalid base URL {:?}: {e}", self.config.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                OcrError::InvalidConfig(format!("base URL cannot take a path: {}", self.config.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn job_endpoint(&self, action: &str, job_id: &str) -> Result<Url> {
        if job_id.is_empty() {
            return Err(OcrError::InvalidConfig("job ID is required".to_string()));
        }
        self.endpoint(&["ocr", action, job_id])
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("X-API-KEY", &self.config.api_key)
    }

    /// Current status of a job, without waiting.
    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let url = self.job_endpoint("status", job_id)?;
        debug!("Fetching job status: {}", job_id);

        let resp = self.authorized(self.client.get(url)).send().await?;
        let wire: StatusResponse = read_json(resp, "failed to get job status").await?;

        Ok(JobStatus {
            id: job_id.to_string(),
            state: JobState::parse(wire.status.as_deref().unwrap_or_default()),
            progress: wire.progress_percentage.unwrap_or_default(),
            estimated_time: wire.processing_time,
            error: wire.error_message,
        })
    }

    /// Final result of a completed job.
    pub async fn job_result(&self, job_id: &str) -> Result<OcrResult> {
        let url = self.job_endpoint("result", job_id)?;
        debug!("Fetching job result: {}", job_id);

        let resp = self.authorized(self.client.get(url)).send().await?;
        let wire: ResultResponse = read_json(resp, "failed to get job result").await?;

        Ok(assemble_result(job_id, wire))
    }

    /// Submit a document hosted at `file_url` for processing.
    pub async fn process_url(&self, file_url: &str, options: &ProcessingOptions) -> Result<Job> {
        let body = UrlUploadRequest {
            url: file_url,
            format: options.format,
            model: options.tier.as_str(),
            instructions: options.instructions.as_deref(),
            schema: options.schema.as_ref(),
        };

        info!("Submitting {} for processing", file_url);

        let resp = self
            .authorized(self.client.post(self.endpoint(&["ocr", "uploads", "url"])?))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let wire: UploadResponse =
            read_json(resp, "failed to start processing from URL").await?;

        let id = match wire.job_id {
            Some(id) if !id.is_empty() => id,
            _ => {
                return Err(OcrError::Api {
                    status,
                    message: "failed to start processing from URL: response carried no job_id"
                        .to_string(),
                })
            }
        };
        let job = Job {
            id,
            status: wire.status.unwrap_or_else(|| "processing".to_string()),
        };
        info!("Submitted job {}", job.id);
        Ok(job)
    }

    /// Delete a job: page content is redacted server-side and stored files removed.
    pub async fn delete_job(&self, job_id: &str) -> Result<()> {
        let url = self.job_endpoint("delete", job_id)?;
        let resp = self.authorized(self.client.delete(url)).send().await?;
        if !resp.status().is_success() {
            return Err(api_error(resp, "failed to delete job").await);
        }

        info!("Deleted job {}", job_id);
        Ok(())
    }

    /// Block until `job_id` completes, using default wait options.
    pub async fn wait_until_done(
        &self,
        cancel: &dyn Cancellation,
        job_id: &str,
    ) -> Result<OcrResult> {
        waiter::wait_until_done(self, cancel, job_id).await
    }

    pub async fn wait_until_done_with_options(
        &self,
        cancel: &dyn Cancellation,
        job_id: &str,
        options: WaitOptions,
    ) -> Result<OcrResult> {
        waiter::wait_until_done_with_options(self, cancel, job_id, options).await
    }
}

#[async_trait::async_trait]
impl JobApi for OcrClient {
    type Output = OcrResult;

    async fn get_status(&self, cancel: &dyn Cancellation, job_id: &str) -> Result<JobStatus> {
        until_cancelled(cancel, self.job_status(job_id)).await
    }

    /// Not raced against `cancel`: completion has already been observed, so the
    /// fetch is bounded by the per-request timeout instead.
    async fn get_result(&self, _cancel: &dyn Cancellation, job_id: &str) -> Result<OcrResult> {
        self.job_result(job_id).await
    }
}

/// Runs `request`, abandoning it if `cancel` fires first.
async fn until_cancelled<T>(
    cancel: &dyn Cancellation,
    request: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.triggered() => Err(OcrError::timeout(cancel.reason())),
        result = request => result,
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response, context: &str) -> Result<T> {
    if !resp.status().is_success() {
        return Err(api_error(resp, context).await);
    }
    let raw = resp.bytes().await?;
    Ok(serde_json::from_slice(&raw)?)
}

async fn api_error(resp: Response, context: &str) -> OcrError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let detail = match body.trim() {
        "" => status.to_string(),
        text => text.to_string(),
    };
    OcrError::Api {
        status,
        message: format!("{context}: {detail}"),
    }
}

fn assemble_result(job_id: &str, wire: ResultResponse) -> OcrResult {
    let mut result = OcrResult {
        job_id: job_id.to_string(),
        status: "completed".to_string(),
        credits: wire.credits_used.unwrap_or_default(),
        duration: wire
            .processing_time_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_default(),
        ..Default::default()
    };

    for (i, page) in wire.pages.into_iter().enumerate() {
        let text = page.text.unwrap_or_default();
        result.text.push_str(&text);
        result.text.push('\n');

        let data = page.data.unwrap_or_default();
        for (k, v) in &data {
            result.data.insert(k.clone(), v.clone());
        }

        result.pages.push(PageResult {
            page_number: page.page_number.unwrap_or(i as u32 + 1),
            text,
            data: data.into_iter().collect(),
            confidence: page.confidence.unwrap_or_default(),
        });
    }

    result
}

// ── Wire request/response types ─────────────────────────────────────────────

#[derive(Serialize)]
struct UrlUploadRequest<'a> {
    url: &'a str,
    format: crate::types::Format,
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a serde_json::Value>,
}

#[derive(Deserialize)]
struct UploadResponse {
    job_id: Option<String>,
    status: Option<String>,
}

#[derive(Deserialize)]
struct StatusResponse {
    status: Option<String>,
    progress_percentage: Option<f64>,
    processing_time: Option<u64>,
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct ResultResponse {
    #[serde(default)]
    pages: Vec<WirePage>,
    credits_used: Option<u64>,
    processing_time_seconds: Option<f64>,
}

#[derive(Deserialize)]
struct WirePage {
    page_number: Option<u32>,
    text: Option<String>,
    data: Option<serde_json::Map<String, serde_json::Value>>,
    confidence: Option<f64>,
}
