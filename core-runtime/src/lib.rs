//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the mirroring core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus for upload lifecycle notifications
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other crates depend on. It
//! establishes the logging conventions, the configuration surface loaded by
//! hosts, and the broadcast channel that carries upload events.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
