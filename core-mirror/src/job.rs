//! # Upload Job State Machine
//!
//! Tracks the lifecycle of one mirroring request with validated state
//! transitions.
//!
//! ## State Machine
//!
//! ```text
//! Created → Started → Succeeded
//!              ↓
//!            Failed
//! ```
//!
//! Each job reaches exactly one terminal state. There is no retry: a failed
//! job stays failed.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use crate::error::{MirrorError, Result};

// ============================================================================
// Request / Outcome
// ============================================================================

/// One mirroring request.
///
/// The source is `job_dir/name`. The whole `job_dir` is deleted when the
/// job ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    /// Caller-assigned job identifier
    pub job_id: String,
    /// Per-job working directory owned by the engine for the job's lifetime
    pub job_dir: PathBuf,
    /// Entry inside `job_dir` to upload (file or directory)
    pub name: String,
}

impl UploadRequest {
    pub fn new(job_id: impl Into<String>, job_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            job_dir: job_dir.into(),
            name: name.into(),
        }
    }

    /// Local path of the entry to upload.
    pub fn source_path(&self) -> PathBuf {
        self.job_dir.join(&self.name)
    }

    /// Checks that every path the job touches stays inside its own
    /// directory.
    ///
    /// `job_id` must be a single plain path component, `job_dir` must be
    /// named after it, and `name` must be a relative path made only of plain
    /// components.
    pub fn validate(&self) -> Result<()> {
        if !is_single_component(&self.job_id) {
            return Err(MirrorError::InvalidRequest(format!(
                "job id '{}' must be a single path component",
                self.job_id
            )));
        }

        if self.job_dir.file_name() != Some(OsStr::new(&self.job_id)) {
            return Err(MirrorError::InvalidRequest(format!(
                "job directory {} is not named after job '{}'",
                self.job_dir.display(),
                self.job_id
            )));
        }

        let name = Path::new(&self.name);
        let plain = name
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if self.name.is_empty() || !plain {
            return Err(MirrorError::InvalidRequest(format!(
                "name '{}' must be a relative path inside the job directory",
                self.name
            )));
        }

        Ok(())
    }

    /// Display name of the uploaded root: the final component of `name`.
    pub fn display_name(&self) -> String {
        Path::new(&self.name)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Counts of remote objects created by a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorStats {
    /// Folders created, including the top-level folder for a directory upload
    pub containers_created: u64,
    /// Files uploaded
    pub files_uploaded: u64,
}

impl MirrorStats {
    pub fn total(&self) -> u64 {
        self.containers_created + self.files_uploaded
    }
}

/// Result of a successful job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub job_id: String,
    /// Display name of the uploaded root
    pub name: String,
    /// Public link: direct download for a file, folder view for a directory
    pub link: String,
    pub stats: MirrorStats,
}

// ============================================================================
// Listener
// ============================================================================

/// Receives the lifecycle notifications of one job.
///
/// A job calls `on_upload_started` once, then exactly one of
/// `on_upload_complete` or `on_upload_error`.
#[cfg_attr(test, mockall::automock)]
pub trait UploadListener: Send + Sync {
    fn on_upload_started(&self, name: &str);

    fn on_upload_complete(&self, link: &str, name: &str);

    fn on_upload_error(&self, message: &str);
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadJobStatus {
    Created,
    Started,
    Succeeded,
    Failed,
}

impl UploadJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadJobStatus::Succeeded | UploadJobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadJobStatus::Created => "created",
            UploadJobStatus::Started => "started",
            UploadJobStatus::Succeeded => "succeeded",
            UploadJobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for UploadJobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Upload Job Entity
// ============================================================================

/// Bookkeeping record for one upload job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadJob {
    pub id: String,
    /// Display name of the uploaded root
    pub name: String,
    pub status: UploadJobStatus,
    pub stats: MirrorStats,
    /// Public link once succeeded
    pub link: Option<String>,
    /// Error message once failed
    pub error_message: Option<String>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

impl UploadJob {
    /// Create a job in `Created` state.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: UploadJobStatus::Created,
            stats: MirrorStats::default(),
            link: None,
            error_message: None,
            created_at: current_timestamp(),
            started_at: None,
            completed_at: None,
        }
    }

    /// # Errors
    ///
    /// Returns an error if the job is not in `Created` state
    pub fn start(mut self) -> Result<Self> {
        self.validate_transition(UploadJobStatus::Started)?;
        self.status = UploadJobStatus::Started;
        self.started_at = Some(current_timestamp());
        Ok(self)
    }

    /// # Errors
    ///
    /// Returns an error if the job is not in `Started` state
    pub fn succeed(mut self, link: String, stats: MirrorStats) -> Result<Self> {
        self.validate_transition(UploadJobStatus::Succeeded)?;
        self.status = UploadJobStatus::Succeeded;
        self.completed_at = Some(current_timestamp());
        self.link = Some(link);
        self.stats = stats;
        Ok(self)
    }

    /// Record a failure. `stats` keeps whatever was created before it.
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Started` state
    pub fn fail(mut self, error_message: String, stats: MirrorStats) -> Result<Self> {
        self.validate_transition(UploadJobStatus::Failed)?;
        self.status = UploadJobStatus::Failed;
        self.completed_at = Some(current_timestamp());
        self.error_message = Some(error_message);
        self.stats = stats;
        Ok(self)
    }

    /// Seconds between start and completion, once both are known.
    pub fn duration_secs(&self) -> Option<u64> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start).max(0) as u64),
            _ => None,
        }
    }

    fn validate_transition(&self, to: UploadJobStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (UploadJobStatus::Created, UploadJobStatus::Started)
                | (UploadJobStatus::Started, UploadJobStatus::Succeeded)
                | (UploadJobStatus::Started, UploadJobStatus::Failed)
        );

        if !valid {
            let reason = if self.status.is_terminal() {
                format!("Job {} already {}", self.id, self.status)
            } else {
                format!("Cannot transition from {} to {}", self.status, to)
            };
            return Err(MirrorError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason,
            });
        }

        Ok(())
    }
}

fn is_single_component(value: &str) -> bool {
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => part == value,
        _ => false,
    }
}

fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

// ============================================================================
// Tests
// ============================================================================
