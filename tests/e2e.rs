//! End-to-end tests for propdoc-extract against live services.
//!
//! These tests read PDFs from `./test_cases/` and call the real conversion
//! and completion endpoints. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PROPDOC_CONVERSION_URL=https://… OPENAI_API_KEY=sk-… \
//!     cargo test --test e2e -- --nocapture

use propdoc_extract::{
    extract, extract_text, extract_to_file, DocumentKind, IntakeConfig, IntakeError,
    PropertyDraft, TenantDraft,
};
use std::path::PathBuf;
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn output_dir() -> PathBuf {
    let d = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/output");
    std::fs::create_dir_all(&d).ok();
    d
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Live configuration from the environment.
fn live_config() -> IntakeConfig {
    let mut builder = IntakeConfig::builder()
        .conversion_url(
            std::env::var("PROPDOC_CONVERSION_URL").expect("PROPDOC_CONVERSION_URL must be set"),
        )
        .request_timeout(Duration::from_secs(120));
    if let Ok(key) = std::env::var("PROPDOC_CONVERSION_API_KEY") {
        builder = builder.conversion_api_key(key);
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY") {
        builder = builder.api_key(key);
    }
    if let Ok(model) = std::env::var("PROPDOC_MODEL") {
        builder = builder.model(model);
    }
    builder.build().expect("valid config")
}

// ── Text extraction (conversion service only) ────────────────────────────────

#[tokio::test]
async fn test_text_of_property_brochure() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("property_brochure.pdf"));

    let content = extract_text(&path, &live_config())
        .await
        .expect("text extraction should succeed");

    assert!(!content.text.trim().is_empty(), "Extracted text is empty");
    assert!(content.metadata.page_count >= 1);
    println!(
        "✓ {} chars, {} pages, title={:?}",
        content.text.len(),
        content.metadata.page_count,
        content.metadata.title
    );
}

#[tokio::test]
async fn test_missing_file_is_reported() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }

    let err = extract_text("/definitely/not/a/real/file.pdf", &live_config())
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::FileNotFound { .. }), "{err:?}");
}

// ── Full extraction (needs completion API) ───────────────────────────────────

#[tokio::test]
async fn test_extract_property_brochure() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("property_brochure.pdf"));
    let out_path = output_dir().join("property_brochure.json");

    let record = extract_to_file(&path, DocumentKind::Property, &out_path, &live_config())
        .await
        .expect("extraction should succeed");

    assert!(!record.is_empty(), "Model returned an empty record");
    let draft = PropertyDraft::from_result(&record);
    assert!(
        draft.name.is_some() || draft.address.is_some(),
        "Expected a property name or address, got {draft:?}"
    );
    assert!(out_path.exists());
    println!("✓ {} fields → {}", record.len(), out_path.display());
}

#[tokio::test]
async fn test_extract_rental_application() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("rental_application.pdf"));

    let record = extract(&path, DocumentKind::Tenant, &live_config())
        .await
        .expect("extraction should succeed");

    let draft = TenantDraft::from_result(&record);
    assert!(
        draft.first_name.is_some() || draft.email.is_some(),
        "Expected a tenant name or email, got {draft:?}"
    );
    println!("✓ {draft:?}");
}
