use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type ApiResult<T> = std::result::Result<T, UploadError>;

/// Failures of the image upload API, answered as `{"error": "..."}`.
#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("expected a multipart form: {0}")]
    NotMultipart(#[from] MultipartRejection),
    #[error("no image provided")]
    MissingImage,
    #[error("unsupported image type; use JPEG, PNG, GIF or WebP")]
    Unsupported,
    #[error("invalid upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("storage error")]
    Storage(#[source] std::io::Error),
    #[error("failed to save image")]
    Save(#[source] std::io::Error),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::NotMultipart(rejection) => rejection.status(),
            UploadError::MissingImage | UploadError::Unsupported => StatusCode::BAD_REQUEST,
            // Covers oversized bodies (413) as well as malformed ones (400)
            UploadError::Multipart(err) => err.status(),
            UploadError::Storage(_) | UploadError::Save(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Client errors are explained; server-side causes stay in the logs
        let message = match &self {
            UploadError::Multipart(err) if status == StatusCode::PAYLOAD_TOO_LARGE => {
                tracing::info!(error = %err, "upload rejected");
                "image too large".to_string()
            }
            UploadError::Storage(err) | UploadError::Save(err) => {
                tracing::error!(error = %err, "upload failed");
                self.to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Failures while building the template set at startup.
#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("invalid template pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("reading template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing template {name}: {source:#}")]
    Parse {
        name: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("required template {0} is missing")]
    Missing(&'static str),
}
