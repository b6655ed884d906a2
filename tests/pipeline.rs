//! Pipeline tests against mocked conversion and completion services.
//!
//! Both upstreams are served by one `wiremock` server, so these tests run
//! offline and check exactly which calls were made.

use propdoc_extract::{
    extract_to_file, DocumentKind, DocumentPipeline, ErrorKind, IntakeConfig, IntakeError,
    NoopProgressCallback, PropertyDraft, UploadedDocument, ValidationError,
};
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

const BROCHURE_TEXT: &str =
    "Title: Maple Court\nAuthor: Harbour Lettings\n12 units, parking, laundry\x0CPage two";

fn config_for(server: &MockServer) -> IntakeConfig {
    IntakeConfig::builder()
        .conversion_url(format!("{}/convert", server.uri()))
        .conversion_api_key("conv-key")
        .completion_url(format!("{}/v1/chat/completions", server.uri()))
        .api_key("sk-test")
        .retry_base_delay(Duration::from_millis(10))
        .build()
        .unwrap()
}

fn brochure() -> UploadedDocument {
    UploadedDocument::new("brochure.pdf", "application/pdf", b"%PDF-1.4 brochure".to_vec())
}

fn conversion_ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "text": BROCHURE_TEXT }))
}

fn completion_ok(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

async fn mount_conversion(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/convert"))
        .and(header("authorization", "Bearer conv-key"))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

async fn mount_completion(server: &MockServer, response: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(response)
        .expect(calls)
        .mount(server)
        .await;
}

async fn run(
    server: &MockServer,
    document: &UploadedDocument,
    kind: DocumentKind,
) -> Result<propdoc_extract::ExtractionResult, IntakeError> {
    let pipeline = DocumentPipeline::new(config_for(server)).unwrap();
    pipeline
        .run(document, kind, &NoopProgressCallback, &CancellationToken::new())
        .await
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn property_document_end_to_end() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4",
            "max_tokens": 2000,
            "messages": [{ "role": "user" }]
        })))
        .and(body_string_contains("Extract the following property information"))
        .and(body_string_contains("Document pages: 2"))
        .and(body_string_contains("Document title: Maple Court"))
        .respond_with(completion_ok(
            r#"{"property_name":"Maple Court","total_units":12,"features":["parking","laundry"]}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let seen = Mutex::new(Vec::new());
    let progress = |p: u8| seen.lock().unwrap().push(p);
    let pipeline = DocumentPipeline::new(config_for(&server)).unwrap();
    let record = assert_ok!(
        pipeline
            .run(&brochure(), DocumentKind::Property, &progress, &CancellationToken::new())
            .await
    );

    assert_eq!(record.get("property_name"), Some(&json!("Maple Court")));
    assert_eq!(record.get("total_units"), Some(&json!(12)));

    let draft = PropertyDraft::from_result(&record);
    assert_eq!(draft.name.as_deref(), Some("Maple Court"));
    assert_eq!(draft.total_units, Some(12));

    let seen = seen.into_inner().unwrap();
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&100));
}

#[tokio::test]
async fn tenant_prompt_uses_tenant_checklist() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 1).await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("Extract the following tenant information"))
        .respond_with(completion_ok(r#"{"first_name":"Ada","last_name":"Lovelace"}"#))
        .expect(1)
        .mount(&server)
        .await;

    let record = assert_ok!(run(&server, &brochure(), DocumentKind::Tenant).await);
    assert_eq!(record.len(), 2);
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_pdf_makes_no_network_calls() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 0).await;
    mount_completion(&server, completion_ok("{}"), 0).await;

    let image = UploadedDocument::new("photo.png", "image/png", vec![0u8; 64]);
    let err = assert_err!(run(&server, &image, DocumentKind::Property).await);

    assert!(matches!(
        err,
        IntakeError::Validation(ValidationError::UnsupportedType { .. })
    ));
    assert_eq!(err.to_string(), "Invalid file format. Only PDF files are allowed.");
}

#[tokio::test]
async fn oversized_pdf_makes_no_network_calls() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 0).await;
    mount_completion(&server, completion_ok("{}"), 0).await;

    let big = UploadedDocument::new(
        "scan.pdf",
        "application/pdf",
        vec![0u8; 10 * 1024 * 1024 + 1],
    );
    let err = assert_err!(run(&server, &big, DocumentKind::Tenant).await);
    assert_eq!(err.to_string(), "File size exceeds 10MB limit.");
}

// ── Conversion retry ─────────────────────────────────────────────────────────

#[tokio::test]
async fn conversion_recovers_after_two_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    mount_conversion(&server, conversion_ok(), 1).await;
    mount_completion(&server, completion_ok(r#"{"name":"Maple Court"}"#), 1).await;

    let record = assert_ok!(run(&server, &brochure(), DocumentKind::Property).await);
    assert_eq!(record.get("name"), Some(&json!("Maple Court")));
}

#[tokio::test]
async fn conversion_gives_up_after_three_attempts() {
    let server = MockServer::start().await;
    mount_conversion(&server, ResponseTemplate::new(500), 3).await;
    mount_completion(&server, completion_ok("{}"), 0).await;

    let err = assert_err!(run(&server, &brochure(), DocumentKind::Property).await);
    assert!(matches!(err, IntakeError::ConversionFailed { attempts: 3 }));
    assert_eq!(err.to_string(), "PDF conversion failed after multiple attempts");
}

#[tokio::test]
async fn conversion_body_without_text_is_retried() {
    let server = MockServer::start().await;
    mount_conversion(
        &server,
        ResponseTemplate::new(200).set_body_json(json!({ "pages": 2 })),
        3,
    )
    .await;
    mount_completion(&server, completion_ok("{}"), 0).await;

    let err = assert_err!(run(&server, &brochure(), DocumentKind::Property).await);
    assert_eq!(err.kind(), ErrorKind::Conversion);
}

// ── Completion failures ──────────────────────────────────────────────────────

#[tokio::test]
async fn completion_error_message_is_surfaced_verbatim() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 1).await;
    mount_completion(
        &server,
        ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided: sk-test.",
                "type": "invalid_request_error"
            }
        })),
        1,
    )
    .await;

    let err = assert_err!(run(&server, &brochure(), DocumentKind::Tenant).await);
    assert_eq!(err.to_string(), "Incorrect API key provided: sk-test.");
    assert_eq!(err.kind(), ErrorKind::Completion);
}

#[tokio::test]
async fn completion_failure_without_body_uses_fallback() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 1).await;
    // Called once: the completion stage never retries.
    mount_completion(&server, ResponseTemplate::new(502), 1).await;

    let err = assert_err!(run(&server, &brochure(), DocumentKind::Tenant).await);
    assert_eq!(err.to_string(), "Completion API request failed");
}

#[tokio::test]
async fn prose_completion_is_a_parse_error() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 1).await;
    mount_completion(
        &server,
        completion_ok("Sure! The tenant is Ada Lovelace."),
        1,
    )
    .await;

    let err = assert_err!(run(&server, &brochure(), DocumentKind::Tenant).await);
    assert_eq!(err.kind(), ErrorKind::Parse);
}

// ── Cancellation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn cancelled_before_start_makes_no_calls() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 0).await;
    mount_completion(&server, completion_ok("{}"), 0).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let pipeline = DocumentPipeline::new(config_for(&server)).unwrap();
    let err = assert_err!(
        pipeline
            .run(&brochure(), DocumentKind::Property, &NoopProgressCallback, &cancel)
            .await
    );
    assert!(matches!(err, IntakeError::Cancelled));
}

// ── Convenience entry points ─────────────────────────────────────────────────

#[tokio::test]
async fn extract_to_file_writes_pretty_json() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 1).await;
    mount_completion(&server, completion_ok(r#"{"first_name":"Ada"}"#), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("application.pdf");
    tokio::fs::write(&input, b"%PDF-1.4 application").await.unwrap();
    let output = dir.path().join("out/tenant.json");

    let record = assert_ok!(
        extract_to_file(&input, DocumentKind::Tenant, &output, &config_for(&server)).await
    );
    assert_eq!(record.get("first_name"), Some(&json!("Ada")));

    let written: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&output).await.unwrap()).unwrap();
    assert_eq!(written, json!({ "first_name": "Ada" }));
    assert!(!output.with_extension("json.tmp").exists());
}

#[tokio::test]
async fn text_only_pipeline_needs_no_api_key() {
    let server = MockServer::start().await;
    mount_conversion(&server, conversion_ok(), 1).await;

    let config = IntakeConfig::builder()
        .conversion_url(format!("{}/convert", server.uri()))
        .conversion_api_key("conv-key")
        .build()
        .unwrap();
    let pipeline = DocumentPipeline::text_only(config).unwrap();
    let content = assert_ok!(
        pipeline
            .extract_text(&brochure(), &NoopProgressCallback, &CancellationToken::new())
            .await
    );

    assert_eq!(content.metadata.page_count, 2);
    assert_eq!(content.metadata.title.as_deref(), Some("Maple Court"));
    assert_eq!(content.metadata.author.as_deref(), Some("Harbour Lettings"));
}
