//! # Mirroring Engine
//!
//! Mirrors a local file or directory tree into a remote hierarchical object
//! store, shares everything it creates through a public link, and deletes
//! the local copy.
//!
//! ## Overview
//!
//! - [`classify`] - content type from file extension
//! - [`RemoteContainerManager`] - create a shared remote folder
//! - [`FileUploader`] - upload and share one file
//! - [`TreeMirror`] - depth-first directory mirroring
//! - [`MirrorEngine`] - one job end to end, driving the [`UploadJob`] state
//!   machine and notifying an [`UploadListener`]
//!
//! The engine talks to the store through
//! [`RemoteObjectStore`](bridge_traits::storage::RemoteObjectStore) and to
//! the local disk through
//! [`FileSystemAccess`](bridge_traits::storage::FileSystemAccess). It issues
//! every remote call once and awaits it before the next.

pub mod classifier;
pub mod container;
pub mod engine;
pub mod error;
pub mod job;
pub mod links;
pub mod listener;
pub mod tree;
pub mod uploader;

pub use classifier::classify;
pub use container::RemoteContainerManager;
pub use engine::MirrorEngine;
pub use error::{MirrorError, Result};
pub use job::{
    MirrorStats, UploadJob, UploadJobStatus, UploadListener, UploadOutcome, UploadRequest,
};
pub use links::{file_link, folder_link, PUBLIC_READER};
pub use listener::{EventBusListener, TeeListener};
pub use tree::TreeMirror;
pub use uploader::FileUploader;
