use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;

use crate::app_state::AppState;
use crate::models::analysis::UploadResponse;
use crate::routes::ApiError;
use crate::services::storage::object_key;

/// POST /api/v1/upload — store a room photo and return its public URL.
///
/// The file contents are only format-sniffed, never inspected further.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|_| ApiError::Validation("malformed multipart body".to_string()))?;
            file = Some((filename, data.to_vec()));
        }
    }

    let (filename, data) =
        file.ok_or_else(|| ApiError::Validation("missing 'file' field".to_string()))?;

    let format = image::guess_format(&data).map_err(|_| ApiError::UnsupportedMedia)?;

    let key = object_key(Utc::now().timestamp_millis(), &filename);
    state
        .storage
        .upload(&key, &data, format.to_mime_type())
        .await
        .map_err(|e| {
            tracing::error!(key = %key, error = %e, "image upload failed");
            ApiError::Internal("Failed to store image.".to_string())
        })?;

    tracing::info!(key = %key, size = data.len(), "image uploaded");

    let public_url = state.storage.public_url(&key);
    Ok(Json(UploadResponse { key, public_url }))
}
