//! Single-file upload.

use bridge_traits::storage::{FileSystemAccess, NewObject, RemoteObjectStore, UploadSource};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::{MirrorError, Result};
use crate::links::{file_link, PUBLIC_READER, UPLOAD_DESCRIPTION};

/// Uploads one local file and shares it publicly.
///
/// The local file is never modified or deleted here.
#[derive(Clone)]
pub struct FileUploader {
    store: Arc<dyn RemoteObjectStore>,
    fs: Arc<dyn FileSystemAccess>,
}

impl FileUploader {
    pub fn new(store: Arc<dyn RemoteObjectStore>, fs: Arc<dyn FileSystemAccess>) -> Self {
        Self { store, fs }
    }

    /// Upload `local_path` as `display_name` into `parent_id` and return its
    /// direct-download link.
    ///
    /// # Errors
    ///
    /// - [`MirrorError::Filesystem`] if the file cannot be opened
    /// - [`MirrorError::RemoteCall`] if the upload, the permission call or
    ///   the metadata fetch fails
    #[instrument(skip(self, local_path), fields(name = %display_name, parent_id = ?parent_id))]
    pub async fn upload_file(
        &self,
        local_path: &Path,
        display_name: &str,
        mime_type: &str,
        parent_id: Option<&str>,
    ) -> Result<String> {
        let metadata = self
            .fs
            .metadata(local_path)
            .await
            .map_err(MirrorError::filesystem(local_path))?;
        let reader = self
            .fs
            .open_read_stream(local_path)
            .await
            .map_err(MirrorError::filesystem(local_path))?;

        debug!(mime_type, bytes = metadata.size, "Uploading file");

        let object = NewObject::file(display_name, mime_type, parent_id)
            .with_description(UPLOAD_DESCRIPTION);
        let created = self
            .store
            .create_object(&object, UploadSource::new(reader, metadata.size))
            .await
            .map_err(MirrorError::remote("upload file"))?;

        self.store
            .create_permission(&created.id, &PUBLIC_READER)
            .await
            .map_err(MirrorError::remote("create permission"))?;

        let canonical = self
            .store
            .get_object(&created.id)
            .await
            .map_err(MirrorError::remote("get file"))?;

        info!(object_id = %canonical.id, "Uploaded file");
        Ok(file_link(&canonical.id))
    }
}
