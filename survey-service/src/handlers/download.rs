//! Database file download.

use crate::startup::AppState;
use axum::{
    body::Body,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use service_core::error::AppError;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

/// `GET /downloadAccess`: stream the configured file as an attachment.
pub async fn download_database(State(state): State<AppState>) -> Result<Response, AppError> {
    let path = state.config.download.path.as_path();

    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(file_not_found(path)),
        Err(e) => return Err(e.into()),
    };
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(file_not_found(path));
    }
    let size = metadata.len();

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download.db");

    tracing::info!(
        path = %path.display(),
        size = size,
        "Serving database download"
    );

    let headers = [
        (header::CONTENT_TYPE, state.config.download.content_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", file_name),
        ),
        (header::CONTENT_LENGTH, size.to_string()),
    ];

    // The live database may grow mid-download; never send past the declared length.
    let body = Body::from_stream(ReaderStream::new(file.take(size)));
    Ok((headers, body).into_response())
}

fn file_not_found(path: &Path) -> AppError {
    tracing::warn!(path = %path.display(), "Download requested but file is missing");
    AppError::NotFound(anyhow::anyhow!("File not found"))
}
