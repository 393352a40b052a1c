use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;

use crate::error::{AppError, AppResult};
use crate::extractors::ApiPath;
use crate::media::resolve_media_path;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/media/{*path}", get(serve))
}

/// Pull the `file` part out of a multipart body as (bytes, content type).
pub async fn read_file_field(mut multipart: Multipart) -> AppResult<(Bytes, String)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;
        return Ok((bytes, content_type));
    }
    Err(AppError::Validation {
        field: Some("file".to_string()),
        message: "A file upload is required".to_string(),
    })
}

async fn serve(
    State(state): State<AppState>,
    ApiPath(path): ApiPath<String>,
) -> AppResult<Response> {
    let not_found = || AppError::NotFound("File not found".into());

    let full = resolve_media_path(&state.config.uploads_path(), &path).ok_or_else(not_found)?;
    match tokio::fs::metadata(&full).await {
        Ok(meta) if meta.is_file() => {}
        Ok(_) => return Err(not_found()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(AppError::Internal(e.to_string())),
    }
    let data = match tokio::fs::read(&full).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };

    let mime = mime_guess::from_path(&full).first_or_octet_stream();
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        data,
    )
        .into_response())
}
