use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use super::committer::{CommitError, CommitReceipt, SubmissionCommitter};
use super::intake::{IntakeError, Submission, SubmissionIntake};

pub const SUBMIT_PATH: &str = "/api/submit-lamaran";

pub const SUCCESS_MESSAGE: &str = "Lamaran berhasil dikirim!";

/// Shown when a failure carries no text worth surfacing.
pub const GENERIC_FAILURE_MESSAGE: &str = "Terjadi kesalahan pada server.";

/// Intake followed by commit, one request at a time.
#[derive(Debug, Clone)]
pub struct SubmissionService {
    intake: SubmissionIntake,
    committer: SubmissionCommitter,
}

impl SubmissionService {
    pub fn new(intake: SubmissionIntake, committer: SubmissionCommitter) -> Self {
        Self { intake, committer }
    }

    pub fn intake(&self) -> &SubmissionIntake {
        &self.intake
    }

    pub fn committer(&self) -> &SubmissionCommitter {
        &self.committer
    }

    pub async fn submit(
        &self,
        method: &Method,
        multipart: Result<Multipart, MultipartRejection>,
    ) -> Result<CommitReceipt, SubmissionError> {
        let Submission { fields, file } = self.intake.ingest(method, multipart).await?;

        // Owned task: a dropped connection must not cancel a half-finished commit.
        let committer = self.committer.clone();
        let commit = tokio::spawn(async move { committer.commit(&fields, file).await });
        let receipt = commit.await.map_err(SubmissionError::Aborted)??;
        Ok(receipt)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error("commit task ended abnormally: {0}")]
    Aborted(#[source] tokio::task::JoinError),
}

impl SubmissionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmissionError::Intake(err) => err.status(),
            SubmissionError::Commit(err) => err.status(),
            SubmissionError::Aborted(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text placed in the response `message` member.
    pub fn public_message(&self) -> String {
        match self {
            SubmissionError::Intake(IntakeError::Scratch(_)) => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            SubmissionError::Intake(err) => err.to_string(),
            SubmissionError::Commit(err) if err.message().trim().is_empty() => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            SubmissionError::Commit(err) => err.message().to_string(),
            SubmissionError::Aborted(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for SubmissionError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "submission failed");
        }
        (status, Json(MessageBody::new(self.public_message()))).into_response()
    }
}

/// `{"message": "..."}`, the only shape the form reads.
#[derive(Debug, Clone, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Router exposing the application form endpoint.
pub fn submission_router(service: Arc<SubmissionService>) -> Router {
    let body_limit = service.intake().request_body_limit();
    Router::new()
        .route(SUBMIT_PATH, any(submit_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<SubmissionService>>,
    method: Method,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match service.submit(&method, multipart).await {
        Ok(receipt) => {
            info!(file_id = %receipt.file_id, "application submitted");
            (StatusCode::OK, Json(MessageBody::new(SUCCESS_MESSAGE))).into_response()
        }
        Err(err) => err.into_response(),
    }
}
