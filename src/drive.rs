use snafu::ensure;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod constants;
pub mod gdrive;
pub mod port;
pub mod retry;
pub mod types;

use self::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, FOLDER_MIME_TYPE, GENERIC_MIME_TYPE};
use self::port::{CreateFile, DrivePort, FileSource, ListParams, UpdateFile};
use self::retry::RetryPolicy;
use self::types::RemoteFile;
use crate::error::{LocalFileNotFoundSnafu, Result};

/// Fully resolved client configuration.
///
/// Immutable once constructed. Resolution from the environment happens in
/// [`crate::config::load_drive_config`]; the client itself never reads
/// process state.
#[derive(Debug, Clone)]
pub struct DriveConfig {
    pub credentials_path: PathBuf,
    pub root_folder_id: Option<String>,
    pub supports_all_drives: bool,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl DriveConfig {
    pub fn new(credentials_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            root_folder_id: None,
            supports_all_drives: false,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }
}

/// Typed facade over the remote storage port.
///
/// Every operation is a single request/response exchange routed through the
/// retry executor under its own context name. The facade holds no state
/// beyond immutable configuration and the port handle, so concurrent calls
/// against one client are safe.
pub struct DriveClient<P> {
    port: P,
    retry: RetryPolicy,
    root_folder_id: Option<String>,
}

impl<P: DrivePort> DriveClient<P> {
    pub fn new(config: &DriveConfig, port: P) -> Result<Self> {
        let retry = RetryPolicy::fixed(config.max_retries, config.retry_delay)?;
        Ok(Self {
            port,
            retry,
            root_folder_id: config.root_folder_id.clone(),
        })
    }

    pub async fn upload_file(
        &self,
        local_path: &Path,
        mime_type: &str,
        parent_folder_id: Option<&str>,
    ) -> Result<RemoteFile> {
        ensure!(
            local_path.exists(),
            LocalFileNotFoundSnafu {
                path: local_path.to_path_buf()
            }
        );
        log::debug!(
            "upload_file local_path={} mime_type={mime_type} parent={parent_folder_id:?}",
            local_path.display()
        );

        let metadata = CreateFile {
            name: base_name(local_path),
            mime_type: None,
            parents: self.build_parents(parent_folder_id),
        };
        let source = FileSource {
            path: local_path.to_path_buf(),
            mime_type: mime_type.to_string(),
        };

        self.retry
            .execute("upload_file", || {
                self.port.create_file(metadata.clone(), Some(source.clone()))
            })
            .await
    }

    pub async fn list_files(
        &self,
        query: Option<&str>,
        page_size: u32,
    ) -> Result<Vec<RemoteFile>> {
        let params = ListParams {
            query: self.build_query(query),
            page_size,
        };
        log::debug!("list_files query={:?} page_size={page_size}", params.query);

        self.retry
            .execute("list_files", || self.port.list_files(params.clone()))
            .await
    }

    pub async fn get_file_meta(&self, file_id: &str) -> Result<RemoteFile> {
        log::debug!("get_file_meta file_id={file_id}");
        self.retry
            .execute("get_file_meta", || self.port.get_file(file_id))
            .await
    }

    pub async fn download_file(&self, file_id: &str, dest_path: &Path) -> Result<()> {
        log::debug!(
            "download_file file_id={file_id} dest={}",
            dest_path.display()
        );
        self.retry
            .execute("download_file", || {
                self.port.download_file(file_id, dest_path)
            })
            .await
    }

    pub async fn update_file(
        &self,
        file_id: &str,
        new_local_path: Option<&Path>,
        new_name: Option<&str>,
    ) -> Result<RemoteFile> {
        if let Some(path) = new_local_path {
            ensure!(
                path.exists(),
                LocalFileNotFoundSnafu {
                    path: path.to_path_buf()
                }
            );
        }
        log::debug!("update_file file_id={file_id} path={new_local_path:?} name={new_name:?}");

        let metadata = UpdateFile {
            name: new_name.map(str::to_string),
        };
        let source = new_local_path.map(|path| FileSource {
            path: path.to_path_buf(),
            mime_type: GENERIC_MIME_TYPE.to_string(),
        });

        self.retry
            .execute("update_file", || {
                self.port
                    .update_file(file_id, metadata.clone(), source.clone())
            })
            .await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        log::debug!("delete_file file_id={file_id}");
        self.retry
            .execute("delete_file", || self.port.delete_file(file_id))
            .await
    }

    pub async fn create_folder(
        &self,
        name: &str,
        parent_folder_id: Option<&str>,
    ) -> Result<RemoteFile> {
        log::debug!("create_folder name={name} parent={parent_folder_id:?}");

        let metadata = CreateFile {
            name: name.to_string(),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            parents: self.build_parents(parent_folder_id),
        };

        self.retry
            .execute("create_folder", || {
                self.port.create_file(metadata.clone(), None)
            })
            .await
    }

    /// Explicit parent wins over the configured root; with neither, the
    /// provider places the item in its own root.
    fn build_parents(&self, parent_folder_id: Option<&str>) -> Option<Vec<String>> {
        parent_folder_id
            .or(self.root_folder_id.as_deref())
            .map(|parent| vec![parent.to_string()])
    }

    /// AND the root-scoping clause with the caller query, in that order.
    /// `None` means the filter parameter is omitted entirely.
    fn build_query(&self, query: Option<&str>) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(root) = &self.root_folder_id {
            parts.push(format!("'{root}' in parents"));
        }
        if let Some(query) = query {
            parts.push(query.to_string());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" and "))
        }
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::port::mock::{MockPort, sample_file};
    use super::*;
    use crate::error::Error;
    use std::time::Instant;

    fn config() -> DriveConfig {
        let mut config = DriveConfig::new("/tmp/creds.json");
        config.retry_delay = Duration::from_millis(10);
        config
    }

    fn client_with(config: DriveConfig, port: MockPort) -> DriveClient<MockPort> {
        DriveClient::new(&config, port).unwrap()
    }

    fn api_error(status: u16) -> Error {
        Error::Api {
            status,
            message: "unavailable".to_string(),
        }
    }

    #[test]
    fn build_parents_prefers_explicit_parent() {
        let mut cfg = config();
        cfg.root_folder_id = Some("R".to_string());
        let client = client_with(cfg, MockPort::new());

        assert_eq!(client.build_parents(Some("P")), Some(vec!["P".to_string()]));
        assert_eq!(client.build_parents(None), Some(vec!["R".to_string()]));
    }

    #[test]
    fn build_parents_without_root_is_unspecified() {
        let client = client_with(config(), MockPort::new());
        assert_eq!(client.build_parents(None), None);
        assert_eq!(client.build_parents(Some("P")), Some(vec!["P".to_string()]));
    }

    #[test]
    fn build_query_combines_root_and_caller_query() {
        let mut cfg = config();
        cfg.root_folder_id = Some("R".to_string());
        let client = client_with(cfg, MockPort::new());

        assert_eq!(
            client.build_query(None).as_deref(),
            Some("'R' in parents")
        );
        assert_eq!(
            client.build_query(Some("mimeType='text/plain'")).as_deref(),
            Some("'R' in parents and mimeType='text/plain'")
        );
    }

    #[test]
    fn build_query_omitted_when_nothing_to_filter() {
        let client = client_with(config(), MockPort::new());
        assert_eq!(client.build_query(None), None);
        assert_eq!(
            client.build_query(Some("trashed=false")).as_deref(),
            Some("trashed=false")
        );
    }

    #[tokio::test]
    async fn upload_missing_local_file_makes_no_port_calls() {
        let client = client_with(config(), MockPort::new());

        let result = client
            .upload_file(Path::new("/definitely/not/here.bin"), "text/plain", None)
            .await;

        assert!(matches!(result, Err(Error::LocalFileNotFound { .. })));
        assert_eq!(client.port.calls(), 0);
    }

    #[tokio::test]
    async fn upload_sends_basename_and_root_parent() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut cfg = config();
        cfg.root_folder_id = Some("R".to_string());
        let client = client_with(cfg, MockPort::new());

        client
            .upload_file(file.path(), "application/pdf", None)
            .await
            .unwrap();

        let created = client.port.created.lock().unwrap();
        let (metadata, source) = &created[0];
        assert_eq!(metadata.name, base_name(file.path()));
        assert_eq!(metadata.parents, Some(vec!["R".to_string()]));
        assert!(metadata.mime_type.is_none());
        assert_eq!(source.as_ref().unwrap().mime_type, "application/pdf");
    }

    #[tokio::test]
    async fn update_missing_local_file_fails_fast() {
        let client = client_with(config(), MockPort::new());

        let result = client
            .update_file("abc", Some(Path::new("/no/such/file")), None)
            .await;

        assert!(matches!(result, Err(Error::LocalFileNotFound { .. })));
        assert_eq!(client.port.calls(), 0);
    }

    #[tokio::test]
    async fn update_content_uses_generic_mime_type() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let client = client_with(config(), MockPort::new());

        client
            .update_file("abc", Some(file.path()), Some("renamed.bin"))
            .await
            .unwrap();

        let updated = client.port.updated.lock().unwrap();
        let (file_id, metadata, source) = &updated[0];
        assert_eq!(file_id, "abc");
        assert_eq!(metadata.name.as_deref(), Some("renamed.bin"));
        assert_eq!(source.as_ref().unwrap().mime_type, GENERIC_MIME_TYPE);
    }

    #[tokio::test]
    async fn list_files_returns_empty_sequence_not_absence() {
        let client = client_with(config(), MockPort::new());
        let files = client.list_files(None, 20).await.unwrap();
        assert!(files.is_empty());

        let listed = client.port.listed.lock().unwrap();
        assert_eq!(listed[0].page_size, 20);
        assert_eq!(listed[0].query, None);
    }

    #[tokio::test]
    async fn create_folder_carries_folder_mime_marker() {
        let client = client_with(config(), MockPort::new());

        client.create_folder("reports", Some("P")).await.unwrap();

        let created = client.port.created.lock().unwrap();
        let (metadata, source) = &created[0];
        assert_eq!(metadata.name, "reports");
        assert_eq!(metadata.mime_type.as_deref(), Some(FOLDER_MIME_TYPE));
        assert_eq!(metadata.parents, Some(vec!["P".to_string()]));
        assert!(source.is_none());
    }

    #[tokio::test]
    async fn delete_surfaces_not_found_without_retry() {
        let port = MockPort::scripted(vec![Err(api_error(404))]);
        let client = client_with(config(), port);

        let result = client.delete_file("missing").await;

        assert_eq!(client.port.calls(), 1);
        match result {
            Err(Error::Operation { context, source }) => {
                assert_eq!(context, "delete_file");
                assert_eq!(source.status(), Some(404));
            }
            other => panic!("expected Operation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_file_meta_recovers_after_transient_failures() {
        let port = MockPort::scripted(vec![
            Err(api_error(503)),
            Err(api_error(503)),
            Ok(sample_file("abc")),
        ]);
        let client = client_with(config(), port);
        let started = Instant::now();

        let file = client.get_file_meta("abc").await.unwrap();

        assert_eq!(file.id, "abc");
        assert_eq!(client.port.calls(), 3);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn retries_exhausted_after_budget_is_spent() {
        let port = MockPort::scripted(vec![
            Err(api_error(503)),
            Err(api_error(503)),
            Err(api_error(503)),
        ]);
        let client = client_with(config(), port);

        let result = client.get_file_meta("abc").await;

        assert_eq!(client.port.calls(), 3);
        match result {
            Err(Error::RetriesExhausted {
                attempts, source, ..
            }) => {
                assert_eq!(attempts, 3);
                assert_eq!(source.status(), Some(503));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }
}
