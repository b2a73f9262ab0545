use axum::{
    body::Body,
    extract::{Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::cache;
use crate::error::RelayError;
use crate::state::RelayState;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Stream a stored image back, answering conditional requests when enabled
pub async fn serve_image(
    State(state): State<RelayState>,
    Path(filename): Path<String>,
    request_headers: HeaderMap,
) -> Result<Response, RelayError> {
    let object = state.store.get(&filename).await.map_err(RelayError::NotFound)?;
    let head = state.store.head(&filename).await.map_err(RelayError::Stat)?;

    let content_type = head
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(FALLBACK_CONTENT_TYPE));

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, content_type);

    if state.cache_validation {
        headers.extend(cache::validator_headers(&head));

        if cache::is_not_modified(&request_headers, &head) {
            tracing::debug!(key = %filename, "not modified");
            return Ok((StatusCode::NOT_MODIFIED, headers).into_response());
        }
    }

    Ok((headers, Body::from_stream(object.stream)).into_response())
}
