//! Job and result types exchanged with the OCR service.

use crate::error::OcrError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Lifecycle state reported by the service for a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Completed,
    Failed,
    Error,
    Canceled,
    /// Anything else ("queued", "processing", unknown values).
    Pending(String),
}

impl JobState {
    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "error" => Self::Error,
            "canceled" => Self::Canceled,
            other => Self::Pending(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Canceled => "canceled",
            Self::Pending(s) => s,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Error | Self::Canceled)
    }

    pub fn is_terminal(&self) -> bool {
        *self == Self::Completed || self.is_failure()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status poll's view of a job.
#[derive(Debug, Clone)]
pub struct JobStatus {
    pub id: String,
    pub state: JobState,
    /// 0-100, as reported by the service.
    pub progress: f64,
    /// Seconds, when the service reports an estimate.
    pub estimated_time: Option<u64>,
    pub error: Option<String>,
}

/// A submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub status: String,
}

/// Final OCR output for a completed job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OcrResult {
    pub job_id: String,
    pub status: String,
    /// Page texts joined, each followed by a newline.
    pub text: String,
    /// Structured fields merged across pages (later pages win).
    pub data: serde_json::Map<String, serde_json::Value>,
    pub pages: Vec<PageResult>,
    pub credits: u64,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

/// Per-page OCR output (1-indexed).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageResult {
    pub page_number: u32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub confidence: f64,
}

/// Output format requested at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Markdown,
    #[default]
    Structured,
    PerPageStructured,
}

/// Processing tier requested at submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Swift,
    #[default]
    Core,
    Intelli,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Swift => "swift",
            Self::Core => "core",
            Self::Intelli => "intelli",
        }
    }
}

impl FromStr for Format {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "markdown" => Ok(Self::Markdown),
            "structured" => Ok(Self::Structured),
            "per_page_structured" => Ok(Self::PerPageStructured),
            other => Err(OcrError::InvalidConfig(format!("unknown format: {other:?}"))),
        }
    }
}

impl FromStr for Tier {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "swift" => Ok(Self::Swift),
            "core" => Ok(Self::Core),
            "intelli" => Ok(Self::Intelli),
            other => Err(OcrError::InvalidConfig(format!("unknown tier: {other:?}"))),
        }
    }
}

/// Options for submitting a remote document.
#[derive(Debug, Clone, Default)]
pub struct ProcessingOptions {
    pub format: Format,
    pub tier: Tier,
    pub schema: Option<serde_json::Value>,
    pub instructions: Option<String>,
}

impl ProcessingOptions {
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
