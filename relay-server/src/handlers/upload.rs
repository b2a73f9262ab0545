use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;

use crate::error::RelayError;
use crate::state::RelayState;
use crate::transcode::TranscodeError;

/// Multipart field carrying the upload
pub const IMAGE_FIELD: &str = "image";

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Relative path the image can be fetched from
    pub url: String,
}

struct ImageField {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Accept one image, normalize it if configured, and store it under a fresh key
pub async fn upload_image(
    State(state): State<RelayState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, RelayError> {
    let mut multipart = multipart.map_err(|e| RelayError::Form(e.body_text()))?;
    let field = read_image_field(&mut multipart).await?;

    let (data, content_type) = match &state.transcoder {
        Some(transcoder) => {
            let transcoder = Arc::clone(transcoder);
            let raw = field.data;
            let out = tokio::task::spawn_blocking(move || transcoder.transcode(&raw))
                .await
                .map_err(|e| TranscodeError::Worker(e.to_string()))??;
            (out.bytes, out.content_type.to_string())
        }
        None => (
            field.data,
            field
                .content_type
                .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string()),
        ),
    };

    let key = state.keys.next_key(&field.filename);
    let size = data.len();

    state
        .store
        .put(&key, &content_type, data)
        .await
        .map_err(RelayError::Upload)?;

    tracing::info!(key = %key, content_type = %content_type, size, "stored image");

    Ok(Json(UploadResponse {
        url: format!("/uploads/{}", key),
    }))
}

async fn read_image_field(multipart: &mut Multipart) -> Result<ImageField, RelayError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RelayError::Form(e.to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // Plain text parts carry no filename and are not uploads
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| RelayError::Form(e.to_string()))?;

        tracing::debug!(filename = %filename, size = data.len(), "received upload field");

        return Ok(ImageField {
            filename,
            content_type,
            data,
        });
    }

    Err(RelayError::Form(format!("no file in field \"{}\"", IMAGE_FIELD)))
}
