use futures::{Stream, TryStreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, LOCATION};
use snafu::ResultExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use yup_oauth2::authenticator::Authenticator;

use crate::drive::DriveConfig;
use crate::drive::constants::FILE_FIELDS;
use crate::drive::port::{CreateFile, DrivePort, FileSource, ListParams, UpdateFile};
use crate::drive::types::{FileList, RemoteFile};
use crate::error::{CredentialsSnafu, Error, Result};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const LIST_FIELDS: &str =
    "files(id,name,mimeType,size,modifiedTime,parents,webViewLink),nextPageToken";

type DriveAuthenticator =
    Authenticator<hyper_rustls::HttpsConnector<hyper::client::HttpConnector>>;

/// Google Drive v3 implementation of [`DrivePort`].
///
/// Token acquisition is delegated to yup-oauth2's service-account flow;
/// uploads and content updates go through resumable sessions so the file
/// body is streamed rather than buffered.
pub struct GoogleDrive {
    http: reqwest::Client,
    auth: DriveAuthenticator,
    supports_all_drives: bool,
}

impl GoogleDrive {
    pub async fn new(config: &DriveConfig) -> Result<Self> {
        let key = yup_oauth2::read_service_account_key(&config.credentials_path)
            .await
            .context(CredentialsSnafu {
                path: config.credentials_path.clone(),
            })?;
        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .context(CredentialsSnafu {
                path: config.credentials_path.clone(),
            })?;

        Ok(Self {
            http: reqwest::Client::new(),
            auth,
            supports_all_drives: config.supports_all_drives,
        })
    }

    async fn bearer(&self) -> Result<String> {
        let token = self
            .auth
            .token(&[DRIVE_SCOPE])
            .await
            .map_err(|error| Error::Auth {
                message: error.to_string(),
            })?;
        match token.token() {
            Some(token) => Ok(token.to_string()),
            None => Err(Error::Auth {
                message: "token response contained no access token".to_string(),
            }),
        }
    }

    /// Map non-2xx responses to classified API errors, extracting the
    /// message from Google's error envelope when present.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Api {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    /// Open a resumable upload session and stream the file body to it.
    async fn upload_via_session(
        &self,
        session: reqwest::RequestBuilder,
        source: &FileSource,
    ) -> Result<RemoteFile> {
        let response = Self::check_response(
            session
                .header("X-Upload-Content-Type", source.mime_type.as_str())
                .send()
                .await?,
        )
        .await?;

        let upload_url = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::TransferFailed {
                detail: "resumable session returned no upload URL".to_string(),
            })?;

        let file = tokio::fs::File::open(&source.path).await?;
        let length = file.metadata().await?.len();
        let stream = tokio_util::io::ReaderStream::new(file);

        let response = self
            .http
            .put(&upload_url)
            .header(CONTENT_TYPE, source.mime_type.as_str())
            .header(CONTENT_LENGTH, length)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|error| Error::TransferFailed {
                detail: error.to_string(),
            })?;
        let response = Self::check_response(response).await?;

        response.json().await.map_err(|error| Error::TransferFailed {
            detail: format!("upload completed but the response was unreadable: {error}"),
        })
    }

}

impl DrivePort for GoogleDrive {
    async fn create_file(
        &self,
        metadata: CreateFile,
        content: Option<FileSource>,
    ) -> Result<RemoteFile> {
        let bearer = self.bearer().await?;

        match content {
            Some(source) => {
                let session = self
                    .http
                    .post(format!("{DRIVE_UPLOAD_BASE}/files"))
                    .bearer_auth(bearer)
                    .query(&[("uploadType", "resumable")])
                    .query(&[("fields", FILE_FIELDS)])
                    .query(&[("supportsAllDrives", self.supports_all_drives)])
                    .json(&metadata);
                self.upload_via_session(session, &source).await
            }
            None => {
                let response = self
                    .http
                    .post(format!("{DRIVE_API_BASE}/files"))
                    .bearer_auth(bearer)
                    .query(&[("fields", FILE_FIELDS)])
                    .query(&[("supportsAllDrives", self.supports_all_drives)])
                    .json(&metadata)
                    .send()
                    .await?;
                Ok(Self::check_response(response).await?.json().await?)
            }
        }
    }

    async fn list_files(&self, params: ListParams) -> Result<Vec<RemoteFile>> {
        let mut request = self
            .http
            .get(format!("{DRIVE_API_BASE}/files"))
            .bearer_auth(self.bearer().await?)
            .query(&[("pageSize", params.page_size)])
            .query(&[("fields", LIST_FIELDS)])
            .query(&[
                ("supportsAllDrives", self.supports_all_drives),
                ("includeItemsFromAllDrives", self.supports_all_drives),
            ]);
        if let Some(query) = &params.query {
            request = request.query(&[("q", query.as_str())]);
        }

        let response = Self::check_response(request.send().await?).await?;
        let list: FileList = response.json().await?;
        Ok(list.files)
    }

    async fn get_file(&self, file_id: &str) -> Result<RemoteFile> {
        let response = self
            .http
            .get(format!("{DRIVE_API_BASE}/files/{file_id}"))
            .bearer_auth(self.bearer().await?)
            .query(&[("fields", FILE_FIELDS)])
            .query(&[("supportsAllDrives", self.supports_all_drives)])
            .send()
            .await?;
        Ok(Self::check_response(response).await?.json().await?)
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()> {
        let response = self
            .http
            .get(format!("{DRIVE_API_BASE}/files/{file_id}"))
            .bearer_auth(self.bearer().await?)
            .query(&[("alt", "media")])
            .query(&[("supportsAllDrives", self.supports_all_drives)])
            .send()
            .await?;
        let response = Self::check_response(response).await?;

        stage_and_rename(response.bytes_stream(), dest).await
    }

    async fn update_file(
        &self,
        file_id: &str,
        metadata: UpdateFile,
        content: Option<FileSource>,
    ) -> Result<RemoteFile> {
        let bearer = self.bearer().await?;

        match content {
            Some(source) => {
                let session = self
                    .http
                    .patch(format!("{DRIVE_UPLOAD_BASE}/files/{file_id}"))
                    .bearer_auth(bearer)
                    .query(&[("uploadType", "resumable")])
                    .query(&[("fields", FILE_FIELDS)])
                    .query(&[("supportsAllDrives", self.supports_all_drives)])
                    .json(&metadata);
                self.upload_via_session(session, &source).await
            }
            None => {
                let response = self
                    .http
                    .patch(format!("{DRIVE_API_BASE}/files/{file_id}"))
                    .bearer_auth(bearer)
                    .query(&[("fields", FILE_FIELDS)])
                    .query(&[("supportsAllDrives", self.supports_all_drives)])
                    .json(&metadata)
                    .send()
                    .await?;
                Ok(Self::check_response(response).await?.json().await?)
            }
        }
    }

    async fn delete_file(&self, file_id: &str) -> Result<()> {
        let response = self
            .http
            .delete(format!("{DRIVE_API_BASE}/files/{file_id}"))
            .bearer_auth(self.bearer().await?)
            .query(&[("supportsAllDrives", self.supports_all_drives)])
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }
}

/// Write the stream to `<dest>.part` and rename on success. A failed
/// stream removes the staging file and leaves `dest` untouched.
async fn stage_and_rename<S, B, E>(stream: S, dest: &Path) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let staging = staging_path(dest);
    match copy_to_staging(stream, &staging).await {
        Ok(()) => {
            tokio::fs::rename(&staging, dest).await?;
            Ok(())
        }
        Err(error) => {
            let _ = tokio::fs::remove_file(&staging).await;
            Err(error)
        }
    }
}

async fn copy_to_staging<S, B, E>(stream: S, staging: &Path) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut file = tokio::fs::File::create(staging).await?;
    let mut stream = std::pin::pin!(stream);
    while let Some(chunk) = stream
        .try_next()
        .await
        .map_err(|error| Error::TransferFailed {
            detail: error.to_string(),
        })?
    {
        file.write_all(chunk.as_ref())
            .await
            .map_err(|error| Error::TransferFailed {
                detail: error.to_string(),
            })?;
    }
    file.flush().await?;
    Ok(())
}

fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_path_appends_part_suffix() {
        assert_eq!(
            staging_path(Path::new("/tmp/report.pdf")),
            PathBuf::from("/tmp/report.pdf.part")
        );
        assert_eq!(staging_path(Path::new("plain")), PathBuf::from("plain.part"));
    }

    #[test]
    fn error_message_prefers_google_envelope() {
        let body = r#"{"error": {"code": 404, "message": "File not found: abc"}}"#;
        assert_eq!(error_message(body), "File not found: abc");
        assert_eq!(error_message("  upstream exploded "), "upstream exploded");
        assert_eq!(error_message(""), "");
    }

    #[tokio::test]
    async fn successful_stream_renames_staging_to_destination() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.pdf");
        let chunks = futures::stream::iter(vec![
            Ok::<_, String>(b"first ".to_vec()),
            Ok(b"second".to_vec()),
        ]);

        stage_and_rename(chunks, &dest).await.unwrap();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"first second");
        assert!(!staging_path(&dest).exists());
    }

    #[tokio::test]
    async fn failed_stream_leaves_no_destination_or_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.pdf");
        let chunks = futures::stream::iter(vec![
            Ok::<_, String>(b"partial".to_vec()),
            Err("connection reset".to_string()),
        ]);

        let error = stage_and_rename(chunks, &dest).await.unwrap_err();

        assert!(matches!(error, Error::TransferFailed { .. }));
        assert!(!dest.exists());
        assert!(!staging_path(&dest).exists());
    }

    #[tokio::test]
    async fn failed_stream_preserves_existing_destination_content() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("report.pdf");
        tokio::fs::write(&dest, b"previous download").await.unwrap();
        let chunks = futures::stream::iter(vec![
            Ok::<_, String>(b"new bytes".to_vec()),
            Err("connection reset".to_string()),
        ]);

        stage_and_rename(chunks, &dest).await.unwrap_err();

        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"previous download");
        assert!(!staging_path(&dest).exists());
    }
}
