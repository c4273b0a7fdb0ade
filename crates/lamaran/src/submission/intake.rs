use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::Multipart;
use axum::http::{Method, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use super::domain::{
    derive_extension, FieldValue, SubmissionFields, UploadedFile, FIELD_CV, FIELD_EMAIL,
    FIELD_FULL_NAME, FIELD_PHONE, FIELD_POSITION, REQUIRED_TEXT_FIELDS,
};
use crate::config::IntakeConfig;

/// Room for the text fields and multipart framing on top of the file cap.
const REQUEST_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Validated fields plus the staged CV, handed to the committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub fields: SubmissionFields,
    pub file: UploadedFile,
}

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("File CV wajib diunggah.")]
    MissingFile,
    #[error("Data wajib belum lengkap: {}.", .missing.join(", "))]
    MissingFields { missing: Vec<&'static str> },
    #[error("Ukuran file CV melebihi batas {} MB.", .limit_bytes / (1024 * 1024))]
    FileTooLarge { limit_bytes: u64 },
    #[error("File CV harus berformat PDF.")]
    UnsupportedFileType,
    #[error("invalid multipart request: {0}")]
    Malformed(String),
    #[error("unable to stage uploaded file: {0}")]
    Scratch(#[source] std::io::Error),
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            IntakeError::MissingFile
            | IntakeError::MissingFields { .. }
            | IntakeError::UnsupportedFileType
            | IntakeError::Malformed(_) => StatusCode::BAD_REQUEST,
            IntakeError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            IntakeError::Scratch(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Parses the application form and stages the CV in the scratch directory.
#[derive(Debug, Clone)]
pub struct SubmissionIntake {
    scratch_dir: PathBuf,
    max_file_bytes: u64,
    require_pdf: bool,
}

impl SubmissionIntake {
    pub fn new(config: &IntakeConfig) -> Self {
        Self {
            scratch_dir: config.scratch_dir.clone(),
            max_file_bytes: config.max_file_bytes,
            require_pdf: config.require_pdf,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes
    }

    /// Framework body limit; kept above the file cap so the streaming check fires first.
    pub fn request_body_limit(&self) -> usize {
        usize::try_from(self.max_file_bytes.saturating_add(REQUEST_OVERHEAD_BYTES))
            .unwrap_or(usize::MAX)
    }

    pub async fn ensure_scratch_dir(&self) -> Result<(), IntakeError> {
        ensure_private_dir(&self.scratch_dir)
            .await
            .map_err(IntakeError::Scratch)
    }

    /// Accepts only `POST` with a decodable `multipart/form-data` body. On success the
    /// staged file belongs to the caller.
    pub async fn ingest(
        &self,
        method: &Method,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<Submission, IntakeError> {
        if method != Method::POST {
            return Err(IntakeError::MethodNotAllowed);
        }
        let multipart = multipart.map_err(|rejection| IntakeError::Malformed(rejection.body_text()))?;
        self.ingest_multipart(multipart).await
    }

    pub async fn ingest_multipart(&self, mut multipart: Multipart) -> Result<Submission, IntakeError> {
        self.ensure_scratch_dir().await?;

        let mut parts = CollectedParts::default();
        if let Err(err) = self.collect(&mut multipart, &mut parts).await {
            if let Some(file) = parts.file.take() {
                discard_staged(&file.local_path).await;
            }
            return Err(err);
        }

        let Some(file) = parts.file.take() else {
            return Err(IntakeError::MissingFile);
        };

        match parts.into_fields() {
            Ok(fields) => {
                debug!(
                    path = %file.local_path.display(),
                    size_bytes = file.size_bytes,
                    "submission accepted by intake"
                );
                Ok(Submission { fields, file })
            }
            Err(err) => {
                discard_staged(&file.local_path).await;
                Err(err)
            }
        }
    }

    /// Validates text fields supplied outside a multipart body (operator re-drives).
    pub fn fields_from_pairs<I>(pairs: I) -> Result<SubmissionFields, IntakeError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut parts = CollectedParts::default();
        for (name, value) in pairs {
            parts.push_text(name, value);
        }
        parts.into_fields()
    }

    /// Copies a local file into the scratch directory under the same rules a form upload
    /// gets, so the committer's delete never touches the original.
    pub async fn stage_local_copy(
        &self,
        source: &Path,
        mime_type: Option<String>,
    ) -> Result<UploadedFile, IntakeError> {
        self.ensure_scratch_dir().await?;

        let metadata = match tokio::fs::metadata(source).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(IntakeError::MissingFile),
            Err(err) if err.kind() == ErrorKind::NotFound => return Err(IntakeError::MissingFile),
            Err(err) => return Err(IntakeError::Scratch(err)),
        };
        let size_bytes = metadata.len();
        if size_bytes == 0 {
            return Err(IntakeError::MissingFile);
        }
        if size_bytes > self.max_file_bytes {
            return Err(IntakeError::FileTooLarge {
                limit_bytes: self.max_file_bytes,
            });
        }

        let original_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string);
        if self.require_pdf && !looks_like_pdf(original_name.as_deref(), mime_type.as_deref()) {
            return Err(IntakeError::UnsupportedFileType);
        }

        let extension = derive_extension(original_name.as_deref(), mime_type.as_deref());
        let local_path = self
            .scratch_dir
            .join(format!("{}{}", Uuid::new_v4(), extension));
        tokio::fs::copy(source, &local_path)
            .await
            .map_err(IntakeError::Scratch)?;

        Ok(UploadedFile {
            local_path,
            original_name,
            mime_type,
            size_bytes,
        })
    }

    async fn collect(
        &self,
        multipart: &mut Multipart,
        parts: &mut CollectedParts,
    ) -> Result<(), IntakeError> {
        while let Some(mut field) = multipart
            .next_field()
            .await
            .map_err(|err| self.map_multipart_error(err))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == FIELD_CV && field.file_name().is_some() {
                if parts.file.is_some() {
                    parts.extra_files += 1;
                    warn!(extra = parts.extra_files, "ignoring repeated CV part");
                    continue;
                }
                parts.file = self.stage_file(&mut field).await?;
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|err| self.map_multipart_error(err))?;
            parts.push_text(name, value);
        }

        Ok(())
    }

    /// Streams one file part to disk, enforcing the size cap per chunk. Returns `None`
    /// for an empty part, which is what browsers send when no file was chosen.
    async fn stage_file(&self, field: &mut Field<'_>) -> Result<Option<UploadedFile>, IntakeError> {
        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty());
        let mime_type = field.content_type().map(str::to_string);

        if self.require_pdf && !looks_like_pdf(original_name.as_deref(), mime_type.as_deref()) {
            return Err(IntakeError::UnsupportedFileType);
        }

        let extension = derive_extension(original_name.as_deref(), mime_type.as_deref());
        let local_path = self
            .scratch_dir
            .join(format!("{}{}", Uuid::new_v4(), extension));

        let mut out = tokio::fs::File::create(&local_path)
            .await
            .map_err(IntakeError::Scratch)?;

        let mut size_bytes: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(err) => {
                    drop(out);
                    discard_staged(&local_path).await;
                    return Err(self.map_multipart_error(err));
                }
            };

            size_bytes += chunk.len() as u64;
            if size_bytes > self.max_file_bytes {
                drop(out);
                discard_staged(&local_path).await;
                warn!(limit = self.max_file_bytes, "CV exceeded size cap while streaming");
                return Err(IntakeError::FileTooLarge {
                    limit_bytes: self.max_file_bytes,
                });
            }

            if let Err(err) = out.write_all(&chunk).await {
                drop(out);
                discard_staged(&local_path).await;
                return Err(IntakeError::Scratch(err));
            }
        }

        if let Err(err) = out.flush().await {
            drop(out);
            discard_staged(&local_path).await;
            return Err(IntakeError::Scratch(err));
        }
        drop(out);

        if size_bytes == 0 {
            discard_staged(&local_path).await;
            return Ok(None);
        }

        debug!(path = %local_path.display(), size_bytes, "CV staged");
        Ok(Some(UploadedFile {
            local_path,
            original_name,
            mime_type,
            size_bytes,
        }))
    }

    fn map_multipart_error(&self, err: MultipartError) -> IntakeError {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            IntakeError::FileTooLarge {
                limit_bytes: self.max_file_bytes,
            }
        } else {
            IntakeError::Malformed(err.body_text())
        }
    }
}

#[derive(Debug, Default)]
struct CollectedParts {
    text: BTreeMap<String, FieldValue<String>>,
    file: Option<UploadedFile>,
    extra_files: usize,
}

impl CollectedParts {
    fn push_text(&mut self, name: String, value: String) {
        let slot = match self.text.remove(&name) {
            Some(existing) => existing.push(value),
            None => FieldValue::Single(value),
        };
        self.text.insert(name, slot);
    }

    fn take_required(&mut self, name: &str) -> Option<String> {
        self.text
            .remove(name)
            .and_then(FieldValue::first_or_self)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn into_fields(mut self) -> Result<SubmissionFields, IntakeError> {
        let full_name = self.take_required(FIELD_FULL_NAME);
        let phone = self.take_required(FIELD_PHONE);
        let email = self.take_required(FIELD_EMAIL);
        let position = self.take_required(FIELD_POSITION);

        match (full_name, phone, email, position) {
            (Some(full_name), Some(phone), Some(email), Some(position)) => Ok(SubmissionFields {
                full_name,
                phone,
                email,
                position,
            }),
            (full_name, phone, email, position) => {
                let present = [
                    full_name.is_some(),
                    phone.is_some(),
                    email.is_some(),
                    position.is_some(),
                ];
                let missing = REQUIRED_TEXT_FIELDS
                    .iter()
                    .zip(present)
                    .filter(|(_, present)| !present)
                    .map(|(name, _)| *name)
                    .collect();
                Err(IntakeError::MissingFields { missing })
            }
        }
    }
}

fn looks_like_pdf(original_name: Option<&str>, mime_type: Option<&str>) -> bool {
    let by_mime = mime_type
        .map(|value| value.trim().eq_ignore_ascii_case("application/pdf"))
        .unwrap_or(false);
    let by_name = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    by_mime || by_name
}

/// Creates the directory tree if absent. Concurrent callers racing on the same path
/// all succeed.
pub async fn ensure_private_dir(path: &Path) -> std::io::Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o700);

    match builder.create(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Best-effort removal of a staged file.
pub async fn discard_staged(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "staged file removed"),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), error = %err, "failed to remove staged file"),
    }
}
