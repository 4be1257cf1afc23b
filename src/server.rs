//! HTTP demo surface mirroring the CLI operations.
//!
//! Facade errors respond `500` with `{"error": message}`; a missing
//! multipart `file` field responds `400`.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempPath;

use crate::drive::DriveClient;
use crate::drive::constants::{DEFAULT_PAGE_SIZE, GENERIC_MIME_TYPE};
use crate::drive::gdrive::GoogleDrive;
use crate::drive::types::RemoteFile;
use crate::error::{Error, Result};

type SharedClient = Arc<DriveClient<GoogleDrive>>;
type HandlerResult<T> = std::result::Result<T, HttpError>;

pub async fn serve(client: DriveClient<GoogleDrive>, port: u16) -> Result<()> {
    let app = router(Arc::new(client));
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("Drive demo listening on port {port}");
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: SharedClient) -> axum::Router {
    axum::Router::new()
        .route("/upload", post(upload))
        .route("/files", get(list))
        .route("/files/:id", get(meta).put(update).delete(remove))
        .route("/files/:id/download", get(download))
        .with_state(state)
}

struct HttpError(StatusCode, String);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl From<Error> for HttpError {
    fn from(error: Error) -> Self {
        HttpError(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

fn bad_request(message: impl Into<String>) -> HttpError {
    HttpError(StatusCode::BAD_REQUEST, message.into())
}

async fn upload(
    State(client): State<SharedClient>,
    multipart: Multipart,
) -> HandlerResult<Json<RemoteFile>> {
    let staged = stage_multipart_file(multipart).await?;
    let file = client
        .upload_file(&staged.file, &staged.mime_type, None)
        .await?;
    Ok(Json(file))
}

async fn list(State(client): State<SharedClient>) -> HandlerResult<Json<Vec<RemoteFile>>> {
    Ok(Json(client.list_files(None, DEFAULT_PAGE_SIZE).await?))
}

async fn meta(
    State(client): State<SharedClient>,
    Path(id): Path<String>,
) -> HandlerResult<Json<RemoteFile>> {
    Ok(Json(client.get_file_meta(&id).await?))
}

async fn download(
    State(client): State<SharedClient>,
    Path(id): Path<String>,
) -> HandlerResult<Response> {
    let dest = tempfile::Builder::new()
        .prefix("drivify-download-")
        .suffix(&format!("-{}", sanitize_file_name(&id)))
        .tempfile()
        .map_err(Error::from)?
        .into_temp_path();
    client.download_file(&id, &dest).await?;

    let bytes = tokio::fs::read(&dest).await.map_err(Error::from)?;
    Ok((
        [
            (header::CONTENT_TYPE, GENERIC_MIME_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(&id)),
        ],
        bytes,
    )
        .into_response())
}

async fn update(
    State(client): State<SharedClient>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> HandlerResult<Json<RemoteFile>> {
    let staged = stage_multipart_file(multipart).await?;
    let file = client.update_file(&id, Some(&staged.file), None).await?;
    Ok(Json(file))
}

async fn remove(
    State(client): State<SharedClient>,
    Path(id): Path<String>,
) -> HandlerResult<Json<serde_json::Value>> {
    client.delete_file(&id).await?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

/// Staged request body. The temp path is deleted when this drops, after
/// the facade call has finished with it.
struct StagedUpload {
    file: TempPath,
    mime_type: String,
}

/// Pull the `file` field out of the multipart body and stage it to disk
/// so the facade can stream it.
async fn stage_multipart_file(mut multipart: Multipart) -> HandlerResult<StagedUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| bad_request(error.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(sanitize_file_name)
            .unwrap_or_else(|| "upload.bin".to_string());
        let mime_type = field
            .content_type()
            .unwrap_or(GENERIC_MIME_TYPE)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| bad_request(error.to_string()))?;

        let file = stage_bytes(&file_name, &bytes).await?;
        return Ok(StagedUpload { file, mime_type });
    }

    Err(bad_request("Missing file."))
}

/// Stage bytes under a randomised per-request temp path. Concurrent
/// requests carrying the same filename must never share a staging file.
async fn stage_bytes(file_name: &str, bytes: &[u8]) -> Result<TempPath> {
    let path = tempfile::Builder::new()
        .prefix("drivify-")
        .suffix(&format!("-{file_name}"))
        .tempfile()?
        .into_temp_path();
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

fn content_disposition(file_id: &str) -> String {
    format!("attachment; filename=\"{file_id}\"")
}

fn sanitize_file_name(name: &str) -> String {
    std::path::Path::new(name)
        .file_name()
        .map(|base| base.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string())
}
