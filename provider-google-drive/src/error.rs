//! Error types for Google Drive provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// Authentication failed or token is invalid
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// File or folder not found
    #[error("File not found: {file_id}")]
    FileNotFound { file_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Upload accepted by the transport but not by Drive
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    /// Local file could not be read or written
    #[error("Local file error: {0}")]
    Io(#[from] std::io::Error),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

impl GoogleDriveError {
    /// Classify a non-success response
    pub fn from_status(status_code: u16, file_id: Option<&str>, body: &[u8]) -> Self {
        let message = String::from_utf8_lossy(body).trim().to_string();
        match (status_code, file_id) {
            (401, _) => GoogleDriveError::AuthenticationFailed(message),
            (404, Some(file_id)) => GoogleDriveError::FileNotFound {
                file_id: file_id.to_string(),
            },
            _ => GoogleDriveError::ApiError {
                status_code,
                message,
            },
        }
    }
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl From<GoogleDriveError> for BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::FileNotFound { file_id } => BridgeError::NotFound(file_id),
            GoogleDriveError::Io(e) => BridgeError::Io(e),
            GoogleDriveError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
