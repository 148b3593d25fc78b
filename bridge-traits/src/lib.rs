//! # Host Bridge Traits
//!
//! Platform abstraction traits consumed by the mirroring core.
//!
//! ## Overview
//!
//! This crate defines the contract between the core and its collaborators.
//! Each trait represents a capability that the core requires but that is
//! implemented elsewhere (desktop bridges, the Drive connector, test fakes).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Local file listing, streaming reads, deletion
//!
//! ### Remote storage
//! - [`RemoteObjectStore`](storage::RemoteObjectStore) - Create containers and objects, attach
//!   permissions, fetch metadata
//!
//! ### Security
//! - [`SecureStore`](storage::SecureStore) - Credential persistence
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Implementations
//! should convert their own errors into it with actionable messages that include
//! context such as paths or object ids.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across tasks
//! behind `Arc`.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{
    FileMetadata, FileSystemAccess, NewObject, Permission, PermissionRole, PermissionScope,
    RemoteObject, RemoteObjectStore, SecureStore, UploadSource,
};
pub use time::{Clock, LogLevel, SystemClock};
