use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::drive::types::RemoteFile;
use crate::error::Result;

/// Metadata body for `files.create`. Folder creation sets the folder MIME
/// marker here; regular uploads carry their type on the content instead.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFile {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

/// Metadata patch for `files.update`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub query: Option<String>,
    pub page_size: u32,
}

/// Local content handed to the port for upload or content update.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    pub mime_type: String,
}

/// Narrow interface over the remote storage provider.
///
/// The facade and retry executor only ever talk to this trait, keeping the
/// one vendor-specific adapter isolated and swappable in tests.
pub trait DrivePort {
    /// Create a file or folder, streaming `content` when present.
    async fn create_file(
        &self,
        metadata: CreateFile,
        content: Option<FileSource>,
    ) -> Result<RemoteFile>;

    /// Single-page listing. An empty result is a normal outcome.
    async fn list_files(&self, params: ListParams) -> Result<Vec<RemoteFile>>;

    async fn get_file(&self, file_id: &str) -> Result<RemoteFile>;

    /// Stream file content to `dest`, leaving no partial file behind on
    /// failure.
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<()>;

    async fn update_file(
        &self,
        file_id: &str,
        metadata: UpdateFile,
        content: Option<FileSource>,
    ) -> Result<RemoteFile>;

    async fn delete_file(&self, file_id: &str) -> Result<()>;
}
