//! End-to-end orchestration of one upload job.

use bridge_traits::error::BridgeError;
use bridge_traits::storage::{FileSystemAccess, RemoteObjectStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::classifier::classify;
use crate::container::RemoteContainerManager;
use crate::error::{MirrorError, Result};
use crate::job::{MirrorStats, UploadJob, UploadListener, UploadOutcome, UploadRequest};
use crate::links::folder_link;
use crate::tree::TreeMirror;
use crate::uploader::FileUploader;

/// Runs upload jobs against a remote store.
///
/// The engine keeps no per-job state, so one instance (or its clones) can
/// drive any number of jobs concurrently as long as each has its own
/// `job_dir`.
///
/// # Example
///
/// ```ignore
/// use core_mirror::{MirrorEngine, UploadRequest};
///
/// let engine = MirrorEngine::new(store, fs).with_default_parent(Some("0AbC".into()));
/// let request = UploadRequest::new("42", "/downloads/42", "Album");
/// let outcome = engine.upload(&request, &listener).await?;
/// println!("{}", outcome.link);
/// ```
#[derive(Clone)]
pub struct MirrorEngine {
    fs: Arc<dyn FileSystemAccess>,
    containers: RemoteContainerManager,
    uploader: FileUploader,
    tree: TreeMirror,
    default_parent_id: Option<String>,
}

impl MirrorEngine {
    pub fn new(store: Arc<dyn RemoteObjectStore>, fs: Arc<dyn FileSystemAccess>) -> Self {
        let containers = RemoteContainerManager::new(Arc::clone(&store));
        let uploader = FileUploader::new(Arc::clone(&store), Arc::clone(&fs));
        let tree = TreeMirror::new(Arc::clone(&fs), containers.clone(), uploader.clone());

        Self {
            fs,
            containers,
            uploader,
            tree,
            default_parent_id: None,
        }
    }

    /// Folder that receives top-level uploads; `None` uses the store root.
    pub fn with_default_parent(mut self, parent_id: Option<String>) -> Self {
        self.default_parent_id = parent_id;
        self
    }

    pub fn default_parent(&self) -> Option<&str> {
        self.default_parent_id.as_deref()
    }

    /// Upload `request.job_dir/request.name` and delete `request.job_dir`.
    ///
    /// The listener receives `on_upload_started` and then exactly one of
    /// `on_upload_complete` or `on_upload_error`. The job directory is
    /// deleted after that terminal notification, whatever the outcome; a
    /// failed delete is logged and does not change the result.
    ///
    /// A request that fails [`UploadRequest::validate`] is rejected with
    /// [`MirrorError::InvalidRequest`] before the job starts: the listener is
    /// not notified and nothing is uploaded or deleted.
    ///
    /// # Errors
    ///
    /// Returns the error that failed the job, the same one passed to
    /// `on_upload_error`.
    #[instrument(skip(self, request, listener), fields(job_id = %request.job_id, name = %request.name))]
    pub async fn upload(
        &self,
        request: &UploadRequest,
        listener: &dyn UploadListener,
    ) -> Result<UploadOutcome> {
        if let Err(err) = request.validate() {
            warn!(error = %err, "Rejected upload request");
            return Err(err);
        }

        let outcome = self.run_job(request, listener).await;
        self.cleanup(&request.job_dir).await;
        outcome
    }

    async fn run_job(
        &self,
        request: &UploadRequest,
        listener: &dyn UploadListener,
    ) -> Result<UploadOutcome> {
        let name = request.display_name();
        let job = UploadJob::new(&request.job_id, &name).start()?;

        info!("Upload started");
        listener.on_upload_started(&name);

        let mut stats = MirrorStats::default();
        match self
            .mirror_source(&request.source_path(), &name, &mut stats)
            .await
        {
            Ok(link) => {
                let job = job.succeed(link.clone(), stats)?;
                info!(
                    link = %link,
                    files_uploaded = stats.files_uploaded,
                    containers_created = stats.containers_created,
                    duration_secs = ?job.duration_secs(),
                    "Upload completed"
                );
                listener.on_upload_complete(&link, &name);

                Ok(UploadOutcome {
                    job_id: job.id,
                    name,
                    link,
                    stats,
                })
            }
            Err(err) => {
                let message = err.to_string();
                job.fail(message.clone(), stats)?;
                error!(
                    error = %message,
                    files_uploaded = stats.files_uploaded,
                    containers_created = stats.containers_created,
                    "Upload failed"
                );
                listener.on_upload_error(&message);
                Err(err)
            }
        }
    }

    /// Dispatch on the source kind and return the public link.
    async fn mirror_source(
        &self,
        source: &Path,
        name: &str,
        stats: &mut MirrorStats,
    ) -> Result<String> {
        let metadata = self
            .fs
            .metadata(source)
            .await
            .map_err(MirrorError::filesystem(source))?;

        if metadata.is_directory {
            let root_id = self
                .containers
                .create_container(name, self.default_parent())
                .await?;
            stats.containers_created += 1;

            self.tree.mirror_directory(source, &root_id, stats).await?;
            Ok(folder_link(&root_id))
        } else {
            let link = self
                .uploader
                .upload_file(source, name, classify(source), self.default_parent())
                .await?;
            stats.files_uploaded += 1;
            Ok(link)
        }
    }

    async fn cleanup(&self, job_dir: &Path) {
        match self.fs.delete_dir_all(job_dir).await {
            Ok(()) => debug!(path = %job_dir.display(), "Deleted local job directory"),
            Err(BridgeError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %job_dir.display(), "Local job directory already gone");
            }
            Err(e) => warn!(
                path = %job_dir.display(),
                error = %e,
                "Failed to delete local job directory"
            ),
        }
    }
}
