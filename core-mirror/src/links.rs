//! Public sharing policy and link formats.

use bridge_traits::storage::{Permission, PermissionRole, PermissionScope};

/// Permission attached to every created file and folder.
pub const PUBLIC_READER: Permission = Permission {
    role: PermissionRole::Reader,
    scope: PermissionScope::AnyoneWithLink,
};

/// Description stamped on every uploaded file.
pub const UPLOAD_DESCRIPTION: &str = "backup";

/// Direct-download link for an uploaded file.
pub fn file_link(object_id: &str) -> String {
    format!("https://drive.google.com/uc?id={}&export=download", object_id)
}

/// Folder-view link for an uploaded directory.
pub fn folder_link(container_id: &str) -> String {
    format!("https://drive.google.com/folderview?id={}", container_id)
}
