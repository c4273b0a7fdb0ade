use std::fmt::Debug;
use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use google_drive3::{api::File, api::Scope, DriveHub};

use tracing::warn;

use super::{message_from_error_body, RemoteError};

const STAGED_READ_FAILURE: &str = "File CV sementara tidak dapat dibaca.";

/// What to upload and where.
#[derive(Debug, Clone, Copy)]
pub struct DriveUploadRequest<'a> {
    pub name: &'a str,
    pub parent_folder_id: &'a str,
    pub local_path: &'a Path,
    pub mime_type: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveUpload {
    pub file_id: String,
    pub web_view_link: String,
}

#[async_trait]
pub trait DriveGateway: Debug + Send + Sync {
    async fn upload_file(
        &self,
        request: DriveUploadRequest<'_>,
    ) -> Result<DriveUpload, RemoteError>;
}

/// Thin wrapper around the generated google-drive3 client.
pub struct GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    hub: DriveHub<C>,
}

impl<C> GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: DriveHub<C>) -> Self {
        Self { hub }
    }

    fn map_error(err: google_drive3::common::Error) -> RemoteError {
        use google_drive3::common::Error;

        match err {
            Error::MissingToken(source) => RemoteError::Auth(source.to_string()),
            Error::BadRequest(body) => RemoteError::Backend(message_from_error_body(&body)),
            other => RemoteError::Backend(other.to_string()),
        }
    }
}

impl<C> std::fmt::Debug for GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveClient").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C> DriveGateway for GoogleDriveClient<C>
where
    C: google_drive3::common::Connector + Send + Sync + 'static,
{
    async fn upload_file(
        &self,
        request: DriveUploadRequest<'_>,
    ) -> Result<DriveUpload, RemoteError> {
        let metadata = File {
            name: Some(request.name.to_string()),
            parents: Some(vec![request.parent_folder_id.to_string()]),
            ..File::default()
        };

        let mime_type: mime::Mime = request
            .mime_type
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        let content = read_staged(request.local_path).await?;

        let (_, file) = self
            .hub
            .files()
            .create(metadata)
            .param("fields", "id,webViewLink")
            .supports_all_drives(true)
            .add_scope(Scope::File)
            .upload(content, mime_type)
            .await
            .map_err(Self::map_error)?;

        let file_id = file
            .id
            .ok_or_else(|| RemoteError::Backend("drive response missing file id".to_string()))?;
        let web_view_link = file
            .web_view_link
            .unwrap_or_else(|| fallback_view_link(&file_id));

        Ok(DriveUpload {
            file_id,
            web_view_link,
        })
    }
}

/// Loads the staged CV without blocking a runtime worker. The path stays in the log.
async fn read_staged(path: &Path) -> Result<Cursor<Vec<u8>>, RemoteError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Cursor::new(bytes)),
        Err(err) => {
            warn!(error = %err, path = %path.display(), "staged CV could not be read");
            Err(RemoteError::Backend(STAGED_READ_FAILURE.to_string()))
        }
    }
}

fn fallback_view_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/view")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn staged_file_is_read_into_memory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("staged.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").expect("write staged file");

        let content = read_staged(&path).await.expect("staged file read");
        assert_eq!(content.into_inner(), b"%PDF-1.7\n".to_vec());
    }

    #[tokio::test]
    async fn unreadable_staged_file_hides_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("gone.pdf");

        let err = read_staged(&path).await.expect_err("missing file fails");
        let message = err.to_string();
        assert_eq!(message, STAGED_READ_FAILURE);
        assert!(!message.contains(&dir.path().display().to_string()));
    }

    #[test]
    fn fallback_link_points_at_the_file_view() {
        assert_eq!(
            fallback_view_link("1AbC"),
            "https://drive.google.com/file/d/1AbC/view"
        );
    }
}
