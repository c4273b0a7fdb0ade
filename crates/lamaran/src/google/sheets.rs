use std::fmt::Debug;

use async_trait::async_trait;
use google_sheets4::{api::Scope, api::ValueRange, Sheets};
use serde_json::Value;

use super::{message_from_error_body, RemoteError};

/// How Sheets interprets appended cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInputOption {
    /// Parsed as if typed into the UI, so dates and numbers render naturally.
    UserEntered,
    Raw,
}

impl ValueInputOption {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueInputOption::UserEntered => "USER_ENTERED",
            ValueInputOption::Raw => "RAW",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendedRow {
    pub updated_range: Option<String>,
}

#[async_trait]
pub trait SheetsGateway: Debug + Send + Sync {
    async fn append_row(
        &self,
        spreadsheet_id: &str,
        range: &str,
        row: Vec<String>,
        input: ValueInputOption,
    ) -> Result<AppendedRow, RemoteError>;
}

/// Thin wrapper around the generated google-sheets4 client.
pub struct GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    hub: Sheets<C>,
}

impl<C> GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: Sheets<C>) -> Self {
        Self { hub }
    }

    fn map_error(err: google_sheets4::common::Error) -> RemoteError {
        use google_sheets4::common::Error;

        match err {
            Error::MissingToken(source) => RemoteError::Auth(source.to_string()),
            Error::BadRequest(body) => RemoteError::Backend(message_from_error_body(&body)),
            other => RemoteError::Backend(other.to_string()),
        }
    }
}

impl<C> std::fmt::Debug for GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C> SheetsGateway for GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    async fn append_row(
        &self,
        spreadsheet_id: &str,
        range: &str,
        row: Vec<String>,
        input: ValueInputOption,
    ) -> Result<AppendedRow, RemoteError> {
        let request = ValueRange {
            values: Some(vec![row.into_iter().map(Value::String).collect()]),
            ..ValueRange::default()
        };

        let (_, response) = self
            .hub
            .spreadsheets()
            .values_append(request, spreadsheet_id, range)
            .value_input_option(input.as_str())
            .add_scope(Scope::Spreadsheet)
            .doit()
            .await
            .map_err(Self::map_error)?;

        Ok(AppendedRow {
            updated_range: response.updates.and_then(|updates| updates.updated_range),
        })
    }
}
