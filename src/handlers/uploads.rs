// src/handlers/uploads.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    services::blob_store::UPLOADS_URL_PREFIX,
};

fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

// GET /_uploads/{file}
// Comprovantes e imagens gravados pelo armazenamento local.
pub async fn serve_upload(
    State(app_state): State<AppState>,
    _user: AuthenticatedUser,
    Path(file_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let url = format!("{}{}", UPLOADS_URL_PREFIX, file_name);
    let path = app_state.uploads.path_for(&url).ok_or(AppError::NotFound("Arquivo"))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(AppError::NotFound("Arquivo")),
        Err(e) => return Err(AppError::StorageError(e.to_string())),
    };

    Ok(([(header::CONTENT_TYPE, content_type_for(&file_name))], bytes))
}
