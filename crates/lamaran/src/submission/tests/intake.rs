use super::common::*;
use axum::body::Body;
use axum::extract::{FromRequest, Multipart};
use axum::http::{Method, Request};

use crate::config::IntakeConfig;
use crate::submission::intake::ensure_private_dir;
use crate::submission::{IntakeError, SubmissionIntake};

#[tokio::test]
async fn ingest_returns_fields_and_staged_file() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 5 * 1024 * 1024);

    let submission = intake
        .ingest_multipart(multipart(&valid_parts()).await)
        .await
        .expect("valid submission");

    assert_eq!(submission.fields.full_name, "Budi");
    assert_eq!(submission.fields.phone, "0812");
    assert_eq!(submission.fields.email, "budi@example.com");
    assert_eq!(submission.fields.position, "QA");

    let file = submission.file;
    assert_eq!(file.original_name.as_deref(), Some("cv-budi.pdf"));
    assert_eq!(file.mime_type.as_deref(), Some("application/pdf"));
    assert_eq!(file.size_bytes, 10 * 1024);
    assert!(file.local_path.starts_with(scratch.path()));
    assert_eq!(
        file.local_path.extension().and_then(|ext| ext.to_str()),
        Some("pdf")
    );
    let staged = std::fs::read(&file.local_path).expect("staged bytes");
    assert_eq!(staged, pdf_bytes(10 * 1024));
}

#[tokio::test]
async fn repeated_text_fields_keep_first_value() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 5 * 1024 * 1024);

    let mut parts = valid_parts();
    parts.push(Part::text("nama", "Budi Kedua"));
    parts.push(Part::text("posisi", "Backend"));

    let submission = intake
        .ingest_multipart(multipart(&parts).await)
        .await
        .expect("valid submission");

    assert_eq!(submission.fields.full_name, "Budi");
    assert_eq!(submission.fields.position, "QA");
}

#[tokio::test]
async fn repeated_cv_parts_stage_only_the_first() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 5 * 1024 * 1024);

    let mut parts = valid_parts();
    parts.push(Part::file("cv", "second.pdf", pdf_bytes(2048)));

    let submission = intake
        .ingest_multipart(multipart(&parts).await)
        .await
        .expect("valid submission");

    assert_eq!(submission.file.original_name.as_deref(), Some("cv-budi.pdf"));
    assert_eq!(files_in(scratch.path()), 1);
}

#[tokio::test]
async fn each_missing_required_field_is_rejected() {
    for missing in ["nama", "no_hp", "email", "posisi"] {
        let scratch = tempfile::tempdir().expect("tempdir");
        let intake = intake(scratch.path(), 5 * 1024 * 1024);
        let parts: Vec<Part> = valid_parts()
            .into_iter()
            .filter(|part| part.name != missing)
            .collect();

        let err = intake
            .ingest_multipart(multipart(&parts).await)
            .await
            .expect_err("missing field rejected");

        match err {
            IntakeError::MissingFields { missing: names } => assert_eq!(names, vec![missing]),
            other => panic!("unexpected error for {missing}: {other:?}"),
        }
        assert_eq!(files_in(scratch.path()), 0, "staged file removed");
    }
}

#[tokio::test]
async fn blank_field_counts_as_missing() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 5 * 1024 * 1024);
    let mut parts = valid_parts();
    parts[2] = Part::text("email", "   ");

    let err = intake
        .ingest_multipart(multipart(&parts).await)
        .await
        .expect_err("blank email rejected");

    assert!(matches!(err, IntakeError::MissingFields { .. }));
    assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_file_is_reported_before_missing_fields() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 5 * 1024 * 1024);

    let err = intake
        .ingest_multipart(multipart(&[Part::text("nama", "Budi")]).await)
        .await
        .expect_err("missing file rejected");

    assert!(matches!(err, IntakeError::MissingFile));
    assert_eq!(err.to_string(), "File CV wajib diunggah.");
}

#[tokio::test]
async fn empty_file_part_counts_as_missing() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 5 * 1024 * 1024);
    let mut parts = valid_parts();
    parts[4] = Part::file("cv", "", Vec::new());

    let err = intake
        .ingest_multipart(multipart(&parts).await)
        .await
        .expect_err("empty file rejected");

    assert!(matches!(err, IntakeError::MissingFile));
    assert_eq!(files_in(scratch.path()), 0);
}

#[tokio::test]
async fn text_cv_part_is_not_a_file() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 5 * 1024 * 1024);
    let mut parts = valid_parts();
    parts[4] = Part::text("cv", "not a file");

    let err = intake
        .ingest_multipart(multipart(&parts).await)
        .await
        .expect_err("text cv rejected");

    assert!(matches!(err, IntakeError::MissingFile));
}

#[tokio::test]
async fn oversized_file_aborts_during_streaming() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 1024);
    let mut parts = valid_parts();
    parts[4] = Part::file("cv", "big.pdf", pdf_bytes(4096));

    let err = intake
        .ingest_multipart(multipart(&parts).await)
        .await
        .expect_err("oversized file rejected");

    assert!(matches!(err, IntakeError::FileTooLarge { limit_bytes: 1024 }));
    assert_eq!(err.status(), axum::http::StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(files_in(scratch.path()), 0);
}

#[tokio::test]
async fn file_at_exact_cap_is_accepted() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 4096);
    let mut parts = valid_parts();
    parts[4] = Part::file("cv", "exact.pdf", pdf_bytes(4096));

    let submission = intake
        .ingest_multipart(multipart(&parts).await)
        .await
        .expect("file at cap accepted");

    assert_eq!(submission.file.size_bytes, 4096);
}

#[tokio::test]
async fn non_post_methods_are_rejected_without_side_effects() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let scratch_dir = scratch.path().join("never-created");
    let intake = intake(&scratch_dir, 5 * 1024 * 1024);

    let request = Request::builder()
        .method("GET")
        .uri("/api/submit-lamaran")
        .body(Body::empty())
        .expect("request");
    let extracted = Multipart::from_request(request, &()).await;

    let err = intake
        .ingest(&Method::GET, extracted)
        .await
        .expect_err("GET rejected");

    assert!(matches!(err, IntakeError::MethodNotAllowed));
    assert_eq!(err.to_string(), "Method not allowed");
    assert!(!scratch_dir.exists());
}

#[tokio::test]
async fn non_multipart_post_is_malformed() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 5 * 1024 * 1024);

    let request = Request::builder()
        .method("POST")
        .uri("/api/submit-lamaran")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"nama":"Budi"}"#))
        .expect("request");
    let extracted = Multipart::from_request(request, &()).await;

    let err = intake
        .ingest(&Method::POST, extracted)
        .await
        .expect_err("json rejected");

    assert!(matches!(err, IntakeError::Malformed(_)));
}

#[tokio::test]
async fn pdf_enforcement_is_opt_in() {
    let scratch = tempfile::tempdir().expect("tempdir");
    let strict = SubmissionIntake::new(&IntakeConfig {
        scratch_dir: scratch.path().to_path_buf(),
        max_file_bytes: 5 * 1024 * 1024,
        require_pdf: true,
    });

    let mut parts = valid_parts();
    parts[4] = Part {
        name: "cv",
        filename: Some("cv.docx"),
        content_type: Some(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ),
        body: b"PK\x03\x04".to_vec(),
    };

    let err = strict
        .ingest_multipart(multipart(&parts).await)
        .await
        .expect_err("docx rejected");
    assert!(matches!(err, IntakeError::UnsupportedFileType));

    let lenient = intake(scratch.path(), 5 * 1024 * 1024);
    let submission = lenient
        .ingest_multipart(multipart(&parts).await)
        .await
        .expect("docx accepted when enforcement is off");
    assert_eq!(
        submission.file.mime_type.as_deref(),
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
    );
}

#[tokio::test]
async fn scratch_dir_is_created_when_absent() {
    let root = tempfile::tempdir().expect("tempdir");
    let nested = root.path().join("a").join("b").join("uploads");
    let intake = intake(&nested, 5 * 1024 * 1024);

    let submission = intake
        .ingest_multipart(multipart(&valid_parts()).await)
        .await
        .expect("valid submission");

    assert!(nested.is_dir());
    assert!(submission.file.local_path.starts_with(&nested));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_scratch_dir_creation_never_fails() {
    let root = tempfile::tempdir().expect("tempdir");
    let target = root.path().join("shared").join("scratch");

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let target = target.clone();
            tokio::spawn(async move { ensure_private_dir(&target).await })
        })
        .collect();

    for handle in handles {
        handle
            .await
            .expect("task joins")
            .expect("directory creation succeeds");
    }
    assert!(target.is_dir());
}

#[test]
fn fields_from_pairs_applies_form_rules() {
    let fields = SubmissionIntake::fields_from_pairs([
        ("nama".to_string(), "  Budi ".to_string()),
        ("no_hp".to_string(), "0812".to_string()),
        ("email".to_string(), "budi@example.com".to_string()),
        ("posisi".to_string(), "QA".to_string()),
    ])
    .expect("fields accepted");
    assert_eq!(fields.full_name, "Budi");

    let err = SubmissionIntake::fields_from_pairs([
        ("nama".to_string(), "Budi".to_string()),
        ("posisi".to_string(), " ".to_string()),
    ])
    .expect_err("blank and absent fields rejected");
    match err {
        IntakeError::MissingFields { missing } => {
            assert_eq!(missing, vec!["no_hp", "email", "posisi"])
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn local_copy_is_staged_and_original_kept() {
    let source_dir = tempfile::tempdir().expect("tempdir");
    let scratch = tempfile::tempdir().expect("tempdir");
    let source = source_dir.path().join("cv-budi.pdf");
    std::fs::write(&source, pdf_bytes(2048)).expect("write source");
    let intake = intake(scratch.path(), 5 * 1024 * 1024);

    let file = intake
        .stage_local_copy(&source, Some("application/pdf".to_string()))
        .await
        .expect("copy staged");

    assert!(file.local_path.starts_with(scratch.path()));
    assert_ne!(file.local_path, source);
    assert_eq!(file.original_name.as_deref(), Some("cv-budi.pdf"));
    assert_eq!(file.size_bytes, 2048);
    assert!(source.exists());
    assert_eq!(std::fs::read(&file.local_path).expect("staged"), pdf_bytes(2048));
}

#[tokio::test]
async fn local_copy_applies_size_and_presence_checks() {
    let source_dir = tempfile::tempdir().expect("tempdir");
    let scratch = tempfile::tempdir().expect("tempdir");
    let intake = intake(scratch.path(), 1024);

    let missing = source_dir.path().join("absent.pdf");
    let err = intake
        .stage_local_copy(&missing, None)
        .await
        .expect_err("absent file rejected");
    assert!(matches!(err, IntakeError::MissingFile));

    let big = source_dir.path().join("big.pdf");
    std::fs::write(&big, pdf_bytes(4096)).expect("write source");
    let err = intake
        .stage_local_copy(&big, None)
        .await
        .expect_err("oversized file rejected");
    assert!(matches!(err, IntakeError::FileTooLarge { limit_bytes: 1024 }));
    assert_eq!(files_in(scratch.path()), 0);
}
