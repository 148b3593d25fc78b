use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    #[error("OAuth state mismatch (expected {expected}, got {actual})")]
    StateMismatch { expected: String, actual: String },

    #[error("Invalid authorization code: {0}")]
    InvalidAuthCode(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Stored tokens under '{key}' are corrupted: {reason}")]
    TokenCorrupted { key: String, reason: String },

    #[error("Serialization failed during {context}: {source}")]
    SerializationFailed {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Consent flow failed: {0}")]
    ConsentFailed(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
