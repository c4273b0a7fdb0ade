//! Google Workspace collaborators: Drive for the CV, Sheets for the applicant ledger.
//!
//! The gateways are traits so the committer can run against fakes; the `Google*Client`
//! types wrap the generated API hubs.

pub mod auth;
pub mod drive;
pub mod sheets;

use std::time::Duration;

use serde_json::Value;

pub use auth::{connect, GoogleAuthError, GoogleClients, ServiceAccountCredentials};
pub use drive::{DriveGateway, DriveUpload, DriveUploadRequest, GoogleDriveClient};
pub use sheets::{AppendedRow, GoogleSheetsClient, SheetsGateway, ValueInputOption};

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Carries the service's own message when one was returned.
    #[error("{0}")]
    Backend(String),
    #[error("remote call timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

/// Pulls `error.message` out of a Google JSON error body.
pub(crate) fn message_from_error_body(body: &Value) -> String {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.to_string())
}
