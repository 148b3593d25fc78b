//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `FileSystemAccess` using `tokio::fs`
//! - `SecureStore` using a local JSON token-cache file
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileSecureStore, ReqwestHttpClient, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let fs = TokioFileSystem::new();
//!     let secure_store = FileSecureStore::new("token.json");
//!     Ok(())
//! }
//! ```

mod filesystem;
mod http;
mod secure_store;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use secure_store::FileSecureStore;
