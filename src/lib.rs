//! Drive mirror umbrella crate.
//!
//! Re-exports the mirroring engine and runtime layer and, behind the
//! `desktop-shims` feature, the service façade that wires them to the desktop
//! bridges and the Google Drive connector. Hosts can depend on `drive-mirror`
//! alone instead of wiring each workspace crate individually.

pub use core_mirror as mirror;
pub use core_runtime as runtime;

#[cfg(feature = "desktop-shims")]
pub use core_service as service;
