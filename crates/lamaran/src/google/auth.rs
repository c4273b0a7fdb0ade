use std::fmt;
use std::sync::Arc;

use serde_json::json;

use super::drive::{DriveGateway, GoogleDriveClient};
use super::sheets::{GoogleSheetsClient, SheetsGateway};
use crate::config::GoogleConfig;

const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, thiserror::Error)]
pub enum GoogleAuthError {
    #[error("invalid service account credentials: {0}")]
    Credentials(#[source] std::io::Error),
    #[error("unable to load TLS root certificates: {0}")]
    Tls(#[source] std::io::Error),
}

/// Service account principal used for both Drive and Sheets.
#[derive(Clone)]
pub struct ServiceAccountCredentials {
    pub client_email: String,
    pub private_key: String,
}

impl ServiceAccountCredentials {
    pub fn from_config(config: &GoogleConfig) -> Self {
        Self {
            client_email: config.service_account_email.clone(),
            private_key: config.private_key.clone(),
        }
    }

    /// Minimal service-account key document accepted by `yup_oauth2`.
    fn key_document(&self) -> String {
        json!({
            "type": "service_account",
            "client_email": self.client_email,
            "private_key": self.private_key,
            "token_uri": TOKEN_URI,
        })
        .to_string()
    }
}

impl fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

/// Authenticated gateway handles injected into the committer.
#[derive(Debug, Clone)]
pub struct GoogleClients {
    pub drive: Arc<dyn DriveGateway>,
    pub sheets: Arc<dyn SheetsGateway>,
}

/// Builds both hubs. A malformed key fails here, before any request is served.
pub async fn connect(credentials: &ServiceAccountCredentials) -> Result<GoogleClients, GoogleAuthError> {
    let drive = drive_client(credentials).await?;
    let sheets = sheets_client(credentials).await?;
    Ok(GoogleClients {
        drive: Arc::new(drive),
        sheets: Arc::new(sheets),
    })
}

type DriveConnector = google_drive3::hyper_rustls::HttpsConnector<
    google_drive3::hyper_util::client::legacy::connect::HttpConnector,
>;

type SheetsConnector = google_sheets4::hyper_rustls::HttpsConnector<
    google_sheets4::hyper_util::client::legacy::connect::HttpConnector,
>;

pub async fn drive_client(
    credentials: &ServiceAccountCredentials,
) -> Result<GoogleDriveClient<DriveConnector>, GoogleAuthError> {
    use google_drive3::{hyper_rustls, hyper_util, yup_oauth2, DriveHub};

    let key = yup_oauth2::parse_service_account_key(credentials.key_document())
        .map_err(GoogleAuthError::Credentials)?;
    let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(GoogleAuthError::Credentials)?;

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(GoogleAuthError::Tls)?
        .https_or_http()
        .enable_http1()
        .build();
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(connector);

    Ok(GoogleDriveClient::new(DriveHub::new(client, auth)))
}

pub async fn sheets_client(
    credentials: &ServiceAccountCredentials,
) -> Result<GoogleSheetsClient<SheetsConnector>, GoogleAuthError> {
    use google_sheets4::{hyper_rustls, hyper_util, yup_oauth2, Sheets};

    let key = yup_oauth2::parse_service_account_key(credentials.key_document())
        .map_err(GoogleAuthError::Credentials)?;
    let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(GoogleAuthError::Credentials)?;

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(GoogleAuthError::Tls)?
        .https_or_http()
        .enable_http1()
        .build();
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(connector);

    Ok(GoogleSheetsClient::new(Sheets::new(client, auth)))
}
