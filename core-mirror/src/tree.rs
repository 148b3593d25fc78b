//! Recursive directory mirroring.

use bridge_traits::storage::FileSystemAccess;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::classifier::classify;
use crate::container::RemoteContainerManager;
use crate::error::{MirrorError, Result};
use crate::job::MirrorStats;
use crate::uploader::FileUploader;

type MirrorFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Mirrors a local directory tree into a remote folder.
///
/// Traversal is depth-first and strictly sequential: each remote call
/// completes before the next one starts. Entries are visited in file-name
/// order. The first failure aborts the walk; whatever was already created
/// remotely stays in place.
#[derive(Clone)]
pub struct TreeMirror {
    fs: Arc<dyn FileSystemAccess>,
    containers: RemoteContainerManager,
    uploader: FileUploader,
}

impl TreeMirror {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        containers: RemoteContainerManager,
        uploader: FileUploader,
    ) -> Self {
        Self {
            fs,
            containers,
            uploader,
        }
    }

    /// Mirror the contents of `dir` into the folder `parent_id`.
    ///
    /// Each subdirectory becomes a folder under `parent_id` and is mirrored
    /// recursively; each file is uploaded into `parent_id`. Returns
    /// `parent_id`.
    pub async fn mirror_directory(
        &self,
        dir: &Path,
        parent_id: &str,
        stats: &mut MirrorStats,
    ) -> Result<String> {
        self.mirror_boxed(dir, parent_id, stats).await
    }

    fn mirror_boxed<'a>(
        &'a self,
        dir: &'a Path,
        parent_id: &'a str,
        stats: &'a mut MirrorStats,
    ) -> MirrorFuture<'a> {
        Box::pin(self.mirror_level(dir, parent_id, stats))
    }

    #[instrument(skip(self, stats), fields(dir = %dir.display(), parent_id = %parent_id))]
    async fn mirror_level(
        &self,
        dir: &Path,
        parent_id: &str,
        stats: &mut MirrorStats,
    ) -> Result<String> {
        let entries = self.sorted_entries(dir).await?;
        if entries.is_empty() {
            debug!("Directory is empty");
            return Ok(parent_id.to_string());
        }

        for entry in entries {
            let name = entry_name(&entry);
            let metadata = self
                .fs
                .metadata(&entry)
                .await
                .map_err(MirrorError::filesystem(&entry))?;

            if metadata.is_directory {
                let child_id = self
                    .containers
                    .create_container(&name, Some(parent_id))
                    .await?;
                stats.containers_created += 1;
                self.mirror_boxed(&entry, &child_id, stats).await?;
            } else {
                let mime_type = classify(&entry);
                self.uploader
                    .upload_file(&entry, &name, mime_type, Some(parent_id))
                    .await?;
                stats.files_uploaded += 1;
            }
        }

        Ok(parent_id.to_string())
    }

    async fn sorted_entries(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = self
            .fs
            .list_directory(dir)
            .await
            .map_err(MirrorError::filesystem(dir))?;
        entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(entries)
    }
}

/// Final path component as a display name.
pub(crate) fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
