use ocr_waiter::{
    ClientConfig, ErrorKind, JobState, OcrClient, OcrError, ProcessingOptions, Tier,
    TimeoutReason, WaitOptions,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn client_for(server: &MockServer) -> OcrClient {
    let config = ClientConfig::new(API_KEY)
        .with_base_url(format!("{}/api/v1", server.uri()))
        .with_timeout(Duration::from_secs(5));
    OcrClient::new(config).expect("client")
}

fn fast_options() -> WaitOptions {
    WaitOptions::default()
        .with_initial_delay(Duration::from_millis(10))
        .with_max_delay(Duration::from_millis(20))
        .with_max_jitter(Duration::from_millis(1))
}

fn status_body(status: &str) -> serde_json::Value {
    json!({"id": "job-1", "status": status, "progress_percentage": 40.0})
}

async fn mount_result(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/result/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-1",
            "credits_used": 2,
            "pages": [
                {"page_number": 1, "text": "Invoice 42", "data": {"invoice_number": "42"}},
                {"page_number": 2, "text": "Total: 10.00"}
            ]
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn job_status_sends_api_key_and_parses_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/job-1"))
        .and(header("X-API-KEY", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "job-1",
            "status": "processing",
            "progress_percentage": 65.5,
            "processing_time": 12,
            "created_at": "2023-01-01T00:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = client_for(&server).job_status("job-1").await.unwrap();

    assert_eq!(status.id, "job-1");
    assert_eq!(status.state, JobState::Pending("processing".to_string()));
    assert_eq!(status.progress, 65.5);
    assert_eq!(status.estimated_time, Some(12));
    assert!(status.error.is_none());
}

#[tokio::test]
async fn job_result_assembles_pages() {
    let server = MockServer::start().await;
    mount_result(&server, 1).await;

    let result = client_for(&server).job_result("job-1").await.unwrap();

    assert_eq!(result.job_id, "job-1");
    assert_eq!(result.text, "Invoice 42\nTotal: 10.00\n");
    assert_eq!(result.pages.len(), 2);
    assert_eq!(result.credits, 2);
    assert_eq!(result.data["invoice_number"], json!("42"));
}

#[tokio::test]
async fn wait_polls_until_completed() {
    let server = MockServer::start().await;
    let polls = Arc::new(AtomicUsize::new(0));
    let counter = polls.clone();
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/job-1"))
        .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let status = if n < 2 { "processing" } else { "completed" };
            ResponseTemplate::new(200).set_body_json(status_body(status))
        })
        .expect(3)
        .mount(&server)
        .await;
    mount_result(&server, 1).await;

    let token = CancellationToken::new();
    let result = client_for(&server)
        .wait_until_done_with_options(&token, "job-1", fast_options())
        .await
        .unwrap();

    assert_eq!(polls.load(Ordering::SeqCst), 3);
    assert_eq!(result.pages[0].text, "Invoice 42");
}

#[tokio::test]
async fn wait_surfaces_remote_failure_without_fetching_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "job-1",
            "status": "failed",
            "error_message": "document is password protected"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_result(&server, 0).await;

    let token = CancellationToken::new();
    let err = client_for(&server)
        .wait_until_done_with_options(&token, "job-1", fast_options())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::JobFailure);
    assert!(err.to_string().contains("document is password protected"));
}

#[tokio::test]
async fn wait_stops_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("processing")))
        .expect(3)
        .mount(&server)
        .await;
    mount_result(&server, 0).await;

    let token = CancellationToken::new();
    let err = client_for(&server)
        .wait_until_done_with_options(&token, "job-1", fast_options().with_max_attempts(3))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(
        err.timeout_reason(),
        Some(TimeoutReason::MaxAttempts { attempts: 3 })
    );
}

#[tokio::test]
async fn wait_with_cancelled_token_sends_no_requests() {
    let server = MockServer::start().await;
    let token = CancellationToken::new();
    token.cancel();

    let err = client_for(&server)
        .wait_until_done(&token, "job-1")
        .await
        .unwrap_err();

    assert_eq!(err.timeout_reason(), Some(TimeoutReason::Cancelled));
    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn wait_propagates_server_error_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/job-1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let err = client_for(&server)
        .wait_until_done_with_options(&token, "job-1", fast_options())
        .await
        .unwrap_err();

    match &err {
        OcrError::Api { status, message } => {
            assert_eq!(status.as_u16(), 503);
            assert!(message.contains("maintenance"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_status_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).job_status("job-1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn process_url_submits_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/ocr/uploads/url"))
        .and(header("X-API-KEY", API_KEY))
        .and(body_partial_json(json!({
            "url": "https://example.com/document.pdf",
            "format": "structured",
            "model": "intelli",
            "instructions": "extract totals"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-7",
            "status": "processing",
            "source_url": "https://example.com/document.pdf"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = ProcessingOptions::default()
        .with_tier(Tier::Intelli)
        .with_instructions("extract totals");
    let job = client_for(&server)
        .process_url("https://example.com/document.pdf", &options)
        .await
        .unwrap();

    assert_eq!(job.id, "job-7");
    assert_eq!(job.status, "processing");
}

#[tokio::test]
async fn delete_job_reports_body_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/ocr/delete/job-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/ocr/delete/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("job not found"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete_job("job-1").await.unwrap();

    let err = client.delete_job("missing").await.unwrap_err();
    assert_eq!(err.to_string(), "API error (404 Not Found): failed to delete job: job not found");
}

#[tokio::test]
async fn delete_job_requires_id() {
    let server = MockServer::start().await;
    let err = client_for(&server).delete_job("").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn job_id_is_sent_as_single_path_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/a%2Fb"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("processing")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/x%3Fy=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("queued")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let slashed = client.job_status("a/b").await.unwrap();
    assert_eq!(slashed.id, "a/b");
    let queried = client.job_status("x?y=1").await.unwrap();
    assert_eq!(queried.state, JobState::Pending("queued".to_string()));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.url.query().is_none()));
}

#[tokio::test]
async fn cancellation_interrupts_slow_status_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/job-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("processing"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;
    mount_result(&server, 0).await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let start = std::time::Instant::now();
    let err = client_for(&server)
        .wait_until_done_with_options(&token, "job-1", fast_options())
        .await
        .unwrap_err();

    assert_eq!(err.timeout_reason(), Some(TimeoutReason::Cancelled));
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn cancellation_during_result_fetch_keeps_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/status/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("completed")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ocr/result/job-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"job_id": "job-1", "pages": [{"text": "late"}]}))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let result = client_for(&server)
        .wait_until_done_with_options(&token, "job-1", fast_options())
        .await
        .unwrap();

    assert!(token.is_cancelled());
    assert_eq!(result.text, "late\n");
}

#[tokio::test]
async fn process_url_without_job_id_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/ocr/uploads/url"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "processing"})))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .process_url("https://example.com/document.pdf", &ProcessingOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Api);
    assert!(err.to_string().contains("no job_id"));
}
