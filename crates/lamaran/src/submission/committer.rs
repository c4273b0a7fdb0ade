use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::{FixedOffset, Utc};
use tracing::{error, info, warn};

use super::domain::{remote_file_name, RemoteRecord, SubmissionFields, UploadedFile};
use super::intake::discard_staged;
use crate::config::{CommitConfig, GoogleConfig};
use crate::google::{
    DriveGateway, DriveUploadRequest, GoogleClients, RemoteError, SheetsGateway,
    ValueInputOption,
};

/// Remote locations a submission is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTarget {
    pub drive_folder_id: String,
    pub spreadsheet_id: String,
    pub sheets_range: String,
}

impl CommitTarget {
    pub fn from_config(config: &GoogleConfig) -> Self {
        Self {
            drive_folder_id: config.drive_folder_id.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheets_range: config.sheets_range.clone(),
        }
    }
}

/// Result of a fully recorded submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub file_id: String,
    pub link: String,
    pub record: RemoteRecord,
    pub updated_range: Option<String>,
}

/// Display text is the remote service's own message so it can be shown to the applicant.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("{message}")]
    AuthFailed { message: String },
    /// The staged file is left in place.
    #[error("{message}")]
    UploadFailed { message: String, local_path: PathBuf },
    /// The uploaded document stays in Drive without a ledger row.
    #[error("{message}")]
    AppendFailed { message: String, link: String },
}

impl CommitError {
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn message(&self) -> &str {
        match self {
            CommitError::AuthFailed { message }
            | CommitError::UploadFailed { message, .. }
            | CommitError::AppendFailed { message, .. } => message,
        }
    }

    fn from_upload(err: RemoteError, local_path: PathBuf) -> Self {
        match err {
            RemoteError::Auth(message) => CommitError::AuthFailed { message },
            other => CommitError::UploadFailed {
                message: other.to_string(),
                local_path,
            },
        }
    }
}

/// Uploads the CV to Drive, then appends the ledger row. Never retries.
#[derive(Debug, Clone)]
pub struct SubmissionCommitter {
    drive: Arc<dyn DriveGateway>,
    sheets: Arc<dyn SheetsGateway>,
    target: CommitTarget,
    utc_offset: FixedOffset,
    remote_timeout: Duration,
}

impl SubmissionCommitter {
    pub fn new(
        drive: Arc<dyn DriveGateway>,
        sheets: Arc<dyn SheetsGateway>,
        target: CommitTarget,
        config: &CommitConfig,
    ) -> Self {
        Self {
            drive,
            sheets,
            target,
            utc_offset: config.utc_offset,
            remote_timeout: config.remote_timeout,
        }
    }

    pub fn from_clients(clients: GoogleClients, target: CommitTarget, config: &CommitConfig) -> Self {
        Self::new(clients.drive, clients.sheets, target, config)
    }

    pub fn target(&self) -> &CommitTarget {
        &self.target
    }

    /// Takes ownership of the staged file: it is deleted once Drive has it.
    pub async fn commit(
        &self,
        fields: &SubmissionFields,
        file: UploadedFile,
    ) -> Result<CommitReceipt, CommitError> {
        let name = remote_file_name(fields, &file);
        let request = DriveUploadRequest {
            name: &name,
            parent_folder_id: &self.target.drive_folder_id,
            local_path: &file.local_path,
            mime_type: file.mime_or_default(),
        };

        let upload = match self.bounded(self.drive.upload_file(request)).await {
            Ok(upload) => upload,
            Err(err) => {
                warn!(
                    error = %err,
                    path = %file.local_path.display(),
                    "CV upload failed; staged file retained"
                );
                return Err(CommitError::from_upload(err, file.local_path));
            }
        };
        info!(file_id = %upload.file_id, link = %upload.web_view_link, %name, "CV uploaded");

        discard_staged(&file.local_path).await;

        let record = RemoteRecord::new(
            fields,
            upload.web_view_link.clone(),
            Utc::now().with_timezone(&self.utc_offset),
        );
        let appended = self
            .bounded(self.sheets.append_row(
                &self.target.spreadsheet_id,
                &self.target.sheets_range,
                record.clone().into_row(),
                ValueInputOption::UserEntered,
            ))
            .await;

        match appended {
            Ok(appended) => {
                info!(
                    file_id = %upload.file_id,
                    range = appended.updated_range.as_deref().unwrap_or("-"),
                    "submission recorded"
                );
                Ok(CommitReceipt {
                    file_id: upload.file_id,
                    link: upload.web_view_link,
                    record,
                    updated_range: appended.updated_range,
                })
            }
            Err(err) => {
                error!(
                    error = %err,
                    file_id = %upload.file_id,
                    link = %upload.web_view_link,
                    applicant = %fields.full_name,
                    "CV uploaded but ledger row was not appended"
                );
                Err(CommitError::AppendFailed {
                    message: err.to_string(),
                    link: upload.web_view_link,
                })
            }
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.remote_timeout)),
        }
    }
}
