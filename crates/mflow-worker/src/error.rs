//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error(transparent)]
    Media(#[from] mflow_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn download_failed(locator: &str, err: mflow_storage::StorageError) -> Self {
        Self::DownloadFailed(format!("{locator}: {err}"))
    }

    pub fn upload_failed(err: mflow_storage::StorageError) -> Self {
        Self::UploadFailed(err.to_string())
    }

    /// Status code reported in the result envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            WorkerError::InvalidRequest(_) => 400,
            WorkerError::Media(e) if e.is_client_error() => 400,
            _ => 500,
        }
    }
}
