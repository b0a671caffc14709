use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use octofhir_ingest_core::NDJSON_CONTENT_TYPE;
use serde::Serialize;
use tokio_util::io::ReaderStream;

#[derive(Clone)]
pub struct FileServerState {
    pub data_dir: Arc<PathBuf>,
}

impl FileServerState {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Arc::new(data_dir.into()),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn status() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Stream a file from the data directory. The request path is taken
/// relative to the data root.
pub async fn serve_file(State(state): State<FileServerState>, uri: Uri) -> Response {
    let Some(relative) = resolve_relative(uri.path()) else {
        tracing::warn!(path = %uri.path(), "Rejected file request outside the data directory");
        return StatusCode::NOT_FOUND.into_response();
    };
    let path = state.data_dir.join(&relative);

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "File not found");
            return StatusCode::NOT_FOUND.into_response();
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to open file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    match file.metadata().await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to stat file");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let body = Body::from_stream(ReaderStream::new(file));
    ([(header::CONTENT_TYPE, content_type_for(&relative))], body).into_response()
}

fn content_type_for(path: &Path) -> String {
    if path.extension().is_some_and(|ext| ext == "ndjson") {
        return NDJSON_CONTENT_TYPE.to_string();
    }
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Turn a URL path into a relative file path, or `None` if it would leave
/// the data root.
pub(crate) fn resolve_relative(url_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(url_path).ok()?;
    if decoded.contains('\\') || decoded.contains('\0') {
        return None;
    }
    let mut relative = PathBuf::new();
    for component in Path::new(decoded.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if relative.as_os_str().is_empty() {
        return None;
    }
    Some(relative)
}
