use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{FromRequest, Multipart};
use axum::http::header::CONTENT_TYPE;
use axum::http::Request;
use chrono::FixedOffset;

use crate::config::{CommitConfig, IntakeConfig};
use crate::google::{
    AppendedRow, DriveGateway, DriveUpload, DriveUploadRequest, RemoteError, SheetsGateway,
    ValueInputOption,
};
use crate::submission::{CommitTarget, SubmissionCommitter, SubmissionIntake};

pub(super) const BOUNDARY: &str = "lamaran-test-boundary";

pub(super) struct Part {
    pub name: &'static str,
    pub filename: Option<&'static str>,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Part {
    pub fn text(name: &'static str, value: &str) -> Self {
        Self {
            name,
            filename: None,
            content_type: None,
            body: value.as_bytes().to_vec(),
        }
    }

    pub fn file(name: &'static str, filename: &'static str, body: Vec<u8>) -> Self {
        Self {
            name,
            filename: Some(filename),
            content_type: Some("application/pdf"),
            body,
        }
    }
}

pub(super) fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name).as_bytes(),
            ),
        }
        if let Some(content_type) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(&part.body);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub(super) fn multipart_request(method: &str, parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri("/api/submit-lamaran")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("request")
}

pub(super) async fn multipart(parts: &[Part]) -> Multipart {
    Multipart::from_request(multipart_request("POST", parts), &())
        .await
        .expect("multipart extractor")
}

pub(super) fn pdf_bytes(len: usize) -> Vec<u8> {
    let mut bytes = b"%PDF-1.4\n".to_vec();
    bytes.resize(len.max(bytes.len()), b'x');
    bytes
}

pub(super) fn valid_parts() -> Vec<Part> {
    vec![
        Part::text("nama", "Budi"),
        Part::text("no_hp", "0812"),
        Part::text("email", "budi@example.com"),
        Part::text("posisi", "QA"),
        Part::file("cv", "cv-budi.pdf", pdf_bytes(10 * 1024)),
    ]
}

pub(super) fn intake(scratch_dir: &Path, max_file_bytes: u64) -> SubmissionIntake {
    SubmissionIntake::new(&IntakeConfig {
        scratch_dir: scratch_dir.to_path_buf(),
        max_file_bytes,
        require_pdf: false,
    })
}

pub(super) fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub(super) struct RecordedUpload {
    pub name: String,
    pub parent_folder_id: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub(super) struct FakeDrive {
    pub failure: Option<RemoteError>,
    pub delay: Option<Duration>,
    pub uploads: Mutex<Vec<RecordedUpload>>,
}

impl FakeDrive {
    pub fn failing(err: RemoteError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().expect("upload mutex").clone()
    }
}

#[async_trait]
impl DriveGateway for FakeDrive {
    async fn upload_file(
        &self,
        request: DriveUploadRequest<'_>,
    ) -> Result<DriveUpload, RemoteError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let bytes = std::fs::read(request.local_path)
            .map_err(|err| RemoteError::Backend(err.to_string()))?;
        self.uploads.lock().expect("upload mutex").push(RecordedUpload {
            name: request.name.to_string(),
            parent_folder_id: request.parent_folder_id.to_string(),
            mime_type: request.mime_type.to_string(),
            bytes,
        });
        Ok(DriveUpload {
            file_id: "file-123".to_string(),
            web_view_link: "https://drive.google.com/file/d/file-123/view".to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub(super) struct RecordedRow {
    pub spreadsheet_id: String,
    pub range: String,
    pub row: Vec<String>,
    pub input: ValueInputOption,
}

#[derive(Debug, Default)]
pub(super) struct FakeSheets {
    pub failure: Option<RemoteError>,
    pub rows: Mutex<Vec<RecordedRow>>,
}

impl FakeSheets {
    pub fn failing(err: RemoteError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<RecordedRow> {
        self.rows.lock().expect("row mutex").clone()
    }
}

#[async_trait]
impl SheetsGateway for FakeSheets {
    async fn append_row(
        &self,
        spreadsheet_id: &str,
        range: &str,
        row: Vec<String>,
        input: ValueInputOption,
    ) -> Result<AppendedRow, RemoteError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.rows.lock().expect("row mutex").push(RecordedRow {
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
            row,
            input,
        });
        Ok(AppendedRow {
            updated_range: Some("DataRekapPelamar!A2:F2".to_string()),
        })
    }
}

pub(super) fn target() -> CommitTarget {
    CommitTarget {
        drive_folder_id: "folder-abc".to_string(),
        spreadsheet_id: "sheet-xyz".to_string(),
        sheets_range: "DataRekapPelamar!A:F".to_string(),
    }
}

pub(super) fn commit_config(remote_timeout: Duration) -> CommitConfig {
    CommitConfig {
        utc_offset: FixedOffset::east_opt(7 * 3600).expect("offset"),
        remote_timeout,
    }
}

pub(super) fn committer(drive: Arc<FakeDrive>, sheets: Arc<FakeSheets>) -> SubmissionCommitter {
    SubmissionCommitter::new(drive, sheets, target(), &commit_config(Duration::from_secs(5)))
}
