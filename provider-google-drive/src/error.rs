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

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    /// File not found
    #[error("File not found: {file_id}")]
    FileNotFound { file_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The resumable upload session could not be opened or continued
    #[error("Upload session error: {0}")]
    UploadSession(String),

    /// The content stream ended before the declared length
    #[error("Upload source ended after {actual} of {expected} bytes")]
    SourceTruncated { expected: u64, actual: u64 },

    /// Reading upload content failed
    #[error("Failed to read upload content: {0}")]
    Io(#[from] std::io::Error),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl From<GoogleDriveError> for BridgeError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::BridgeError(e) => e,
            GoogleDriveError::Io(e) => BridgeError::Io(e),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

impl From<core_auth::AuthError> for GoogleDriveError {
    fn from(error: core_auth::AuthError) -> Self {
        GoogleDriveError::AuthenticationFailed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GoogleDriveError::ApiError {
            status_code: 404,
            message: "File not found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Google Drive API error (status 404): File not found"
        );
    }

    #[test]
    fn test_error_conversion_keeps_message() {
        let error = GoogleDriveError::AuthenticationFailed("Token expired".to_string());
        let bridge_error: BridgeError = error.into();

        match bridge_error {
            BridgeError::OperationFailed(msg) => assert!(msg.contains("Token expired")),
            other => panic!("unexpected conversion: {:?}", other),
        }
    }

    #[test]
    fn test_io_error_converts_to_bridge_io() {
        let error = GoogleDriveError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "eof",
        ));
        assert!(matches!(BridgeError::from(error), BridgeError::Io(_)));
    }

    #[test]
    fn test_auth_error_conversion() {
        let error: GoogleDriveError =
            core_auth::AuthError::TokenRefreshFailed("revoked".to_string()).into();
        assert!(matches!(error, GoogleDriveError::AuthenticationFailed(_)));
    }
}
