use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relay_blob::BlobError;
use thiserror::Error;

use crate::transcode::TranscodeError;

/// Everything a request handler can fail with. Responses are plain text.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing or malformed `image` form field
    #[error("get form err: {0}")]
    Form(String),

    #[error("process image err: {0}")]
    Process(#[from] TranscodeError),

    #[error("upload file err: {0}")]
    Upload(#[source] BlobError),

    /// The store error is logged, never echoed to the client
    #[error("Image not found")]
    NotFound(#[source] BlobError),

    #[error("Failed to get image stats")]
    Stat(#[source] BlobError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::Form(_) => StatusCode::BAD_REQUEST,
            RelayError::NotFound(_) => StatusCode::NOT_FOUND,
            RelayError::Process(_) | RelayError::Upload(_) | RelayError::Stat(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            RelayError::NotFound(source) => {
                tracing::warn!(status = status.as_u16(), error = %source, "{}", self);
            }
            RelayError::Stat(source) => {
                tracing::error!(status = status.as_u16(), error = %source, "{}", self);
            }
            _ if status.is_server_error() => {
                tracing::error!(status = status.as_u16(), "{}", self);
            }
            _ => {
                tracing::warn!(status = status.as_u16(), "{}", self);
            }
        }

        (status, self.to_string()).into_response()
    }
}
