//! Storage Abstractions
//!
//! Platform-agnostic traits for local file I/O, secure credential storage, and
//! the remote hierarchical object store that uploads are mirrored into.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts the local filesystem so the mirroring engine can be exercised
/// against real directories or against fakes.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn count_entries(fs: &dyn FileSystemAccess, dir: &Path) -> Result<usize> {
///     Ok(fs.list_directory(dir).await?.len())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Delete a directory and all its contents
    async fn delete_dir_all(&self, path: &Path) -> Result<()>;

    /// List the direct entries of a directory
    ///
    /// Ordering is whatever the platform returns; callers that need a stable
    /// order must sort.
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Open a file for streaming reads
    async fn open_read_stream(&self, path: &Path) -> Result<Box<dyn AsyncRead + Send + Unpin>>;
}

/// Secure credential storage trait
///
/// Abstracts where OAuth credentials are persisted between runs (OS keychain,
/// a token-cache file, memory in tests).
///
/// # Security Requirements
///
/// Implementations MUST never log or expose secret values.
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret; succeeds when the key is absent
    async fn delete_secret(&self, key: &str) -> Result<()>;

    /// Check if a secret exists without retrieving it
    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}

/// Role granted by a sharing permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionRole {
    Reader,
    Commenter,
    Writer,
}

impl PermissionRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionRole::Reader => "reader",
            PermissionRole::Commenter => "commenter",
            PermissionRole::Writer => "writer",
        }
    }
}

/// Who a sharing permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    /// Anyone who holds the link; the object is not discoverable by search
    AnyoneWithLink,
    /// Anyone, including discovery through search
    Anyone,
}

/// A sharing permission attached to a remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub role: PermissionRole,
    pub scope: PermissionScope,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            PermissionScope::AnyoneWithLink => "anyone with link",
            PermissionScope::Anyone => "anyone",
        };
        write!(f, "{} ({})", self.role.as_str(), scope)
    }
}

/// Metadata for an object or container about to be created remotely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObject {
    /// Display name
    pub name: String,
    /// Content type; `None` for containers, whose type is chosen by the store
    pub mime_type: Option<String>,
    /// Parent container id; `None` places the object at the store root
    pub parent_id: Option<String>,
    /// Free-form description
    pub description: Option<String>,
}

impl NewObject {
    /// Metadata for a container (folder).
    pub fn container(name: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            parent_id: parent_id.map(str::to_string),
            description: None,
        }
    }

    /// Metadata for a file object.
    pub fn file(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        parent_id: Option<&str>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: Some(mime_type.into()),
            parent_id: parent_id.map(str::to_string),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// An object as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Canonical object id
    pub id: String,
    /// Display name
    pub name: String,
    /// Content type
    pub mime_type: Option<String>,
    /// Parent container ids
    pub parent_ids: Vec<String>,
}

/// Byte source for an object upload.
pub struct UploadSource {
    /// Streaming reader over the content
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    /// Total content length in bytes
    pub length: u64,
}

impl UploadSource {
    pub fn new(reader: Box<dyn AsyncRead + Send + Unpin>, length: u64) -> Self {
        Self { reader, length }
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSource")
            .field("reader", &"AsyncRead { ... }")
            .field("length", &self.length)
            .finish()
    }
}

/// Remote hierarchical object store trait
///
/// The capability set the mirroring engine needs from a storage backend.
/// Every call is a single attempt from the caller's point of view; retry, if
/// any, is the implementation's business.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{NewObject, RemoteObjectStore};
///
/// async fn make_folder(store: &dyn RemoteObjectStore) -> Result<String> {
///     let folder = store.create_container(&NewObject::container("Photos", None)).await?;
///     Ok(folder.id)
/// }
/// ```
#[async_trait]
pub trait RemoteObjectStore: Send + Sync {
    /// Create a container (folder) object
    async fn create_container(&self, object: &NewObject) -> Result<RemoteObject>;

    /// Create a file object and transfer its content
    async fn create_object(&self, object: &NewObject, content: UploadSource)
        -> Result<RemoteObject>;

    /// Attach a sharing permission to an existing object
    async fn create_permission(&self, object_id: &str, permission: &Permission) -> Result<()>;

    /// Fetch object metadata by id
    async fn get_object(&self, object_id: &str) -> Result<RemoteObject>;
}
