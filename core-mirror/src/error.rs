use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    /// A create, permission or fetch call against the remote store failed.
    /// The engine never retries these.
    #[error("Remote call '{operation}' failed: {error}")]
    RemoteCall {
        operation: &'static str,
        error: BridgeError,
    },

    /// The local source is missing or unreadable, or cleanup failed.
    #[error("Filesystem error at {}: {error}", path.display())]
    Filesystem { path: PathBuf, error: BridgeError },

    /// The request names paths outside its own job directory.
    #[error("Invalid upload request: {0}")]
    InvalidRequest(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },
}

impl MirrorError {
    pub(crate) fn remote(operation: &'static str) -> impl FnOnce(BridgeError) -> Self {
        move |error| MirrorError::RemoteCall { operation, error }
    }

    pub(crate) fn filesystem(path: &std::path::Path) -> impl FnOnce(BridgeError) -> Self + '_ {
        move |error| MirrorError::Filesystem {
            path: path.to_path_buf(),
            error,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, MirrorError::RemoteCall { .. })
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
