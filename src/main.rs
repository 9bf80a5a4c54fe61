//! ocr-wait - submit a document (optionally) and block until its OCR job finishes.
//!
//! Reads `OCR_API_KEY` / `OCR_BASE_URL` from the environment (or `.env`).
//! Ctrl-C cancels the wait.

use anyhow::Context;
use clap::Parser;
use ocr_waiter::{Deadline, Format, OcrClient, ProcessingOptions, Tier, WaitOptions};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ocr-wait")]
#[command(about = "Wait for an OCR job to finish and print its result as JSON")]
struct Cli {
    /// ID of an already submitted job
    #[arg(required_unless_present = "url", conflicts_with = "url")]
    job_id: Option<String>,

    /// Submit the document at this URL, then wait for it
    #[arg(long)]
    url: Option<String>,

    /// Output format for a --url submission (markdown, structured, per_page_structured)
    #[arg(long, requires = "url")]
    format: Option<Format>,

    /// Processing tier for a --url submission (swift, core, intelli)
    #[arg(long, requires = "url")]
    tier: Option<Tier>,

    /// Extraction instructions for a --url submission
    #[arg(long, requires = "url")]
    instructions: Option<String>,

    /// Give up after this many status polls (0 = unlimited)
    #[arg(long, env = "OCR_WAIT_MAX_ATTEMPTS", default_value_t = 0)]
    max_attempts: u32,

    /// Give up after this many seconds
    #[arg(long, env = "OCR_WAIT_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

impl Cli {
    fn processing_options(&self) -> ProcessingOptions {
        let mut options = ProcessingOptions::default();
        if let Some(format) = self.format {
            options = options.with_format(format);
        }
        if let Some(tier) = self.tier {
            options = options.with_tier(tier);
        }
        if let Some(instructions) = &self.instructions {
            options = options.with_instructions(instructions.as_str());
        }
        options
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ocr_waiter=debug,ocr_wait=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let client = OcrClient::from_env().context("Failed to configure OCR client")?;

    let job_id = match (&cli.url, &cli.job_id) {
        (Some(url), _) => client.process_url(url, &cli.processing_options()).await?.id,
        (None, Some(id)) => id.clone(),
        (None, None) => anyhow::bail!("either a job ID or --url is required"),
    };

    let options = WaitOptions::default().with_max_attempts(cli.max_attempts);

    let token = CancellationToken::new();
    let deadline = match cli.timeout_secs {
        Some(secs) => Deadline::after(token.clone(), Duration::from_secs(secs)),
        None => Deadline::new(token.clone()),
    };

    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling wait");
            ctrl_c.cancel();
        }
    });

    info!("Waiting for job {}", job_id);
    match client
        .wait_until_done_with_options(&deadline, &job_id, options)
        .await
    {
        Ok(result) => {
            info!(
                "Job {} completed: {} pages, {} credits",
                job_id,
                result.pages.len(),
                result.credits
            );
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            error!("Job {} did not complete: {}", job_id, e);
            Err(e.into())
        }
    }
}
