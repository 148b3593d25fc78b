//! # Google Drive Provider
//!
//! Google Drive API v3 implementation of
//! [`RemoteObjectStore`](bridge_traits::storage::RemoteObjectStore).
//!
//! ## Overview
//!
//! - Folder creation
//! - Resumable, chunked file uploads
//! - Public sharing permissions
//! - File metadata lookup
//!
//! Authentication is delegated to a [`core_auth::CredentialProvider`]; the
//! connector asks it for a bearer token before every request.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{GoogleDriveConnector, DEFAULT_UPLOAD_CHUNK_SIZE, UPLOAD_CHUNK_ALIGNMENT};
pub use error::{GoogleDriveError, Result};
pub use types::{DriveFile, FOLDER_MIME_TYPE};
