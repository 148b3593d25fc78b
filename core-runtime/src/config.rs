//! # Mirror Configuration Module
//!
//! Provides configuration management for the mirroring core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`MirrorConfig`]. Validation is fail-fast: a config that reaches the rest of
//! the core always names a download directory and an OAuth client.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::MirrorConfig;
//!
//! let config = MirrorConfig::builder()
//!     .download_dir("/var/lib/mirror/downloads")
//!     .client_id("1234.apps.googleusercontent.com")
//!     .default_parent_id("0AbCdEf")
//!     .build()?;
//! ```
//!
//! Hosts that configure through the environment use [`MirrorConfig::from_env`],
//! which reads the variables listed in [`env_keys`].

use crate::error::{Error, Result};
use crate::logging::{redact_if_sensitive, LogFormat, LoggingConfig};
use bridge_traits::time::LogLevel;
use std::path::{Component, Path, PathBuf};

/// OAuth scope that limits access to files created by this application.
pub const DEFAULT_OAUTH_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Out-of-band redirect: the user pastes the authorization code back.
pub const DEFAULT_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Token cache file used when none is configured.
pub const DEFAULT_TOKEN_CACHE: &str = "token.json";

/// Environment variable names read by [`MirrorConfig::from_env`].
pub mod env_keys {
    pub const DOWNLOAD_DIR: &str = "DOWNLOAD_DIR";
    pub const PARENT_ID: &str = "GDRIVE_PARENT_ID";
    pub const CLIENT_ID: &str = "GDRIVE_CLIENT_ID";
    pub const CLIENT_SECRET: &str = "GDRIVE_CLIENT_SECRET";
    pub const TOKEN_CACHE: &str = "GDRIVE_TOKEN_CACHE";
    pub const LOG_LEVEL: &str = "MIRROR_LOG_LEVEL";
    pub const LOG_FORMAT: &str = "MIRROR_LOG_FORMAT";
}

/// OAuth client settings for the Drive API.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self
                    .client_secret
                    .as_deref()
                    .map(|secret| redact_if_sensitive("client_secret", secret)),
            )
            .field("scopes", &self.scopes)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Configuration for the mirroring core.
///
/// Use [`MirrorConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Root under which each job's local directory lives (`{download_dir}/{job_id}`)
    pub download_dir: PathBuf,

    /// Drive folder that receives top-level uploads. `None` uploads to the
    /// account root.
    pub default_parent_id: Option<String>,

    /// OAuth client used to obtain and refresh access tokens
    pub oauth: OAuthClientConfig,

    /// File that persists OAuth tokens between runs
    pub token_cache_path: PathBuf,

    pub logging: LoggingConfig,
}

impl MirrorConfig {
    /// Creates a new builder for constructing a `MirrorConfig`.
    pub fn builder() -> MirrorConfigBuilder {
        MirrorConfigBuilder::default()
    }

    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = Self::builder();

        if let Some(dir) = get(env_keys::DOWNLOAD_DIR) {
            builder = builder.download_dir(dir);
        }
        if let Some(parent) = get(env_keys::PARENT_ID) {
            builder = builder.default_parent_id(parent);
        }
        if let Some(client_id) = get(env_keys::CLIENT_ID) {
            builder = builder.client_id(client_id);
        }
        if let Some(secret) = get(env_keys::CLIENT_SECRET) {
            builder = builder.client_secret(secret);
        }
        if let Some(path) = get(env_keys::TOKEN_CACHE) {
            builder = builder.token_cache_path(path);
        }

        let mut logging = LoggingConfig::default();
        if let Some(raw) = get(env_keys::LOG_LEVEL) {
            let level = LogLevel::parse(&raw).ok_or_else(|| {
                Error::Config(format!("{} has unknown level '{}'", env_keys::LOG_LEVEL, raw))
            })?;
            logging = logging.with_level(level);
        }
        if let Some(raw) = get(env_keys::LOG_FORMAT) {
            let format = LogFormat::parse(&raw).ok_or_else(|| {
                Error::Config(format!(
                    "{} has unknown format '{}'",
                    env_keys::LOG_FORMAT,
                    raw
                ))
            })?;
            logging = logging.with_format(format);
        }

        builder.logging(logging).build()
    }

    /// Local directory owned by one job.
    ///
    /// Fails unless `job_id` is a single plain path component, so the result
    /// is always a direct child of `download_dir`.
    pub fn job_dir(&self, job_id: &str) -> Result<PathBuf> {
        let mut components = Path::new(job_id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == job_id => {
                Ok(self.download_dir.join(job_id))
            }
            _ => Err(Error::Config(format!(
                "Job id '{}' must be a single path component",
                job_id
            ))),
        }
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.download_dir.as_os_str().is_empty() {
            return Err(Error::Config("Download directory cannot be empty".to_string()));
        }

        if self.oauth.client_id.trim().is_empty() {
            return Err(Error::Config("OAuth client id cannot be empty".to_string()));
        }

        if self.oauth.scopes.is_empty() {
            return Err(Error::Config(
                "At least one OAuth scope is required".to_string(),
            ));
        }

        if let Some(parent) = &self.default_parent_id {
            if parent.trim().is_empty() {
                return Err(Error::Config(
                    "Default parent folder id cannot be blank; omit it to upload to the root"
                        .to_string(),
                ));
            }
        }

        if self.token_cache_path.as_os_str().is_empty() {
            return Err(Error::Config("Token cache path cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Builder for [`MirrorConfig`].
#[derive(Debug, Default)]
pub struct MirrorConfigBuilder {
    download_dir: Option<PathBuf>,
    default_parent_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    scopes: Option<Vec<String>>,
    redirect_uri: Option<String>,
    token_cache_path: Option<PathBuf>,
    logging: Option<LoggingConfig>,
}

impl MirrorConfigBuilder {
    /// Sets the directory that holds per-job download folders.
    pub fn download_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.download_dir = Some(path.into());
        self
    }

    pub fn default_parent_id(mut self, id: impl Into<String>) -> Self {
        self.default_parent_id = Some(id.into());
        self
    }

    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    pub fn client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Replaces the default `drive.file` scope.
    pub fn scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = Some(scopes.into_iter().map(Into::into).collect());
        self
    }

    pub fn redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(uri.into());
        self
    }

    pub fn token_cache_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.token_cache_path = Some(path.into());
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the download directory or client id is
    /// missing, or when any provided value fails validation.
    pub fn build(self) -> Result<MirrorConfig> {
        let download_dir = self.download_dir.ok_or_else(|| {
            Error::Config(format!(
                "Download directory is required. Set it on the builder or via {}",
                env_keys::DOWNLOAD_DIR
            ))
        })?;

        let client_id = self.client_id.ok_or_else(|| {
            Error::Config(format!(
                "OAuth client id is required. Set it on the builder or via {}",
                env_keys::CLIENT_ID
            ))
        })?;

        let config = MirrorConfig {
            download_dir,
            default_parent_id: self.default_parent_id,
            oauth: OAuthClientConfig {
                client_id,
                client_secret: self.client_secret,
                scopes: self
                    .scopes
                    .unwrap_or_else(|| vec![DEFAULT_OAUTH_SCOPE.to_string()]),
                redirect_uri: self
                    .redirect_uri
                    .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
            },
            token_cache_path: self
                .token_cache_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_CACHE)),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn minimal() -> MirrorConfigBuilder {
        MirrorConfig::builder()
            .download_dir("/tmp/downloads")
            .client_id("client-123")
    }

    #[test]
    fn test_builder_applies_defaults() {
        let config = minimal().build().unwrap();

        assert_eq!(config.download_dir, PathBuf::from("/tmp/downloads"));
        assert_eq!(config.default_parent_id, None);
        assert_eq!(config.oauth.scopes, vec![DEFAULT_OAUTH_SCOPE.to_string()]);
        assert_eq!(config.oauth.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(config.token_cache_path, PathBuf::from(DEFAULT_TOKEN_CACHE));
    }

    #[test]
    fn test_builder_requires_download_dir() {
        let result = MirrorConfig::builder().client_id("client-123").build();
        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("DOWNLOAD_DIR")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_builder_requires_client_id() {
        let result = MirrorConfig::builder().download_dir("/tmp/d").build();
        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("GDRIVE_CLIENT_ID")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_blank_parent() {
        let result = minimal().default_parent_id("  ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_scopes() {
        let result = minimal().scopes(Vec::<String>::new()).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_job_dir_joins_job_id() {
        let config = minimal().build().unwrap();
        assert_eq!(
            config.job_dir("42").unwrap(),
            PathBuf::from("/tmp/downloads/42")
        );
    }

    #[test]
    fn test_job_dir_rejects_ids_outside_download_dir() {
        let config = minimal().build().unwrap();
        for job_id in ["", ".", "..", "../42", "/tmp/x", "a/b"] {
            assert!(
                matches!(config.job_dir(job_id), Err(Error::Config(_))),
                "job id {:?} accepted",
                job_id
            );
        }
    }

    #[test]
    fn test_debug_redacts_client_secret() {
        let config = minimal().client_secret("hunter2").build().unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_lookup_reads_all_keys() {
        let env: HashMap<&str, &str> = [
            (env_keys::DOWNLOAD_DIR, "/srv/dl"),
            (env_keys::PARENT_ID, "folder-1"),
            (env_keys::CLIENT_ID, "cid"),
            (env_keys::CLIENT_SECRET, "csecret"),
            (env_keys::TOKEN_CACHE, "/srv/token.json"),
            (env_keys::LOG_LEVEL, "debug"),
            (env_keys::LOG_FORMAT, "json"),
        ]
        .into_iter()
        .collect();

        let config =
            MirrorConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.download_dir, PathBuf::from("/srv/dl"));
        assert_eq!(config.default_parent_id.as_deref(), Some("folder-1"));
        assert_eq!(config.oauth.client_id, "cid");
        assert_eq!(config.oauth.client_secret.as_deref(), Some("csecret"));
        assert_eq!(config.token_cache_path, PathBuf::from("/srv/token.json"));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_from_lookup_treats_empty_parent_as_unset() {
        let env: HashMap<&str, &str> = [
            (env_keys::DOWNLOAD_DIR, "/srv/dl"),
            (env_keys::CLIENT_ID, "cid"),
            (env_keys::PARENT_ID, ""),
        ]
        .into_iter()
        .collect();

        let config =
            MirrorConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.default_parent_id, None);
    }

    #[test]
    fn test_from_lookup_rejects_unknown_log_level() {
        let env: HashMap<&str, &str> = [
            (env_keys::DOWNLOAD_DIR, "/srv/dl"),
            (env_keys::CLIENT_ID, "cid"),
            (env_keys::LOG_LEVEL, "loud"),
        ]
        .into_iter()
        .collect();

        let result = MirrorConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
