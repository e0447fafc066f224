//! Error types for Google Photos provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GooglePhotosError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Google Photos API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Media item not found: {item_id}")]
    MediaItemNotFound { item_id: String },

    /// The item has no download URL (e.g. a video still processing)
    #[error("No download URL for media item {item_id}")]
    MissingBaseUrl { item_id: String },

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

impl GooglePhotosError {
    /// Classify a non-success response
    pub fn from_status(status_code: u16, item_id: Option<&str>, body: &[u8]) -> Self {
        let message = String::from_utf8_lossy(body).trim().to_string();
        match (status_code, item_id) {
            (401, _) => GooglePhotosError::AuthenticationFailed(message),
            (404, Some(item_id)) => GooglePhotosError::MediaItemNotFound {
                item_id: item_id.to_string(),
            },
            _ => GooglePhotosError::ApiError {
                status_code,
                message,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, GooglePhotosError>;

impl From<GooglePhotosError> for BridgeError {
    fn from(error: GooglePhotosError) -> Self {
        match error {
            GooglePhotosError::MediaItemNotFound { item_id } => BridgeError::NotFound(item_id),
            GooglePhotosError::Io(e) => BridgeError::Io(e),
            GooglePhotosError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
