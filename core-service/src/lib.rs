//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! secure storage) into the mirroring core: the OAuth credential provider,
//! the Google Drive connector and the [`MirrorEngine`]. Desktop hosts
//! typically enable the `desktop-shims` feature (which depends on
//! `bridge-desktop`) and call [`bootstrap_desktop`].

pub mod error;

#[cfg(feature = "desktop-shims")]
mod console;

pub use error::{CoreError, Result};

#[cfg(feature = "desktop-shims")]
pub use console::ConsoleConsentHandler;

use std::sync::Arc;

use bridge_traits::{
    http::HttpClient,
    storage::{FileSystemAccess, SecureStore},
};
use core_auth::{
    CachedCredentialProvider, ConsentHandler, CredentialProvider, OAuthConfig, OAuthFlowManager,
    TokenStore,
};
use core_mirror::{
    EventBusListener, MirrorEngine, TeeListener, UploadListener, UploadOutcome, UploadRequest,
};
use core_runtime::config::MirrorConfig;
use core_runtime::events::{CoreEvent, EventBus};
use provider_google_drive::GoogleDriveConnector;
use tokio::sync::broadcast::Receiver;
use tracing::info;

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    pub secure_store: Arc<dyn SecureStore>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        filesystem: Arc<dyn FileSystemAccess>,
        secure_store: Arc<dyn SecureStore>,
    ) -> Self {
        Self {
            http_client,
            filesystem,
            secure_store,
        }
    }
}

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; clones share the engine, the credential provider and
/// the event bus, so one service can run several jobs at once.
#[derive(Clone)]
pub struct MirrorService {
    config: Arc<MirrorConfig>,
    engine: MirrorEngine,
    event_bus: EventBus,
    credentials: Option<Arc<CachedCredentialProvider>>,
}

impl MirrorService {
    /// Build a service that signs in through the OAuth flow.
    ///
    /// Tokens are cached in `deps.secure_store`; when none are usable,
    /// `consent` is asked to obtain an authorization code.
    pub fn new(
        config: MirrorConfig,
        deps: CoreDependencies,
        consent: Arc<dyn ConsentHandler>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::default();
        let oauth = OAuthConfig::google(
            config.oauth.client_id.clone(),
            config.oauth.client_secret.clone(),
            config.oauth.redirect_uri.clone(),
            config.oauth.scopes.clone(),
        );
        let flow = OAuthFlowManager::new(oauth, Arc::clone(&deps.http_client));
        let token_store = TokenStore::new(Arc::clone(&deps.secure_store));
        let credentials = Arc::new(
            CachedCredentialProvider::new(flow, token_store, consent)
                .with_event_bus(event_bus.clone()),
        );

        let mut service = Self::assemble(config, deps, credentials.clone(), event_bus);
        service.credentials = Some(credentials);
        Ok(service)
    }

    /// Build a service around an externally managed credential provider.
    pub fn with_credentials(
        config: MirrorConfig,
        deps: CoreDependencies,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, deps, credentials, EventBus::default()))
    }

    fn assemble(
        config: MirrorConfig,
        deps: CoreDependencies,
        credentials: Arc<dyn CredentialProvider>,
        event_bus: EventBus,
    ) -> Self {
        let connector = GoogleDriveConnector::new(Arc::clone(&deps.http_client), credentials);
        let engine = MirrorEngine::new(Arc::new(connector), Arc::clone(&deps.filesystem))
            .with_default_parent(config.default_parent_id.clone());

        info!(
            download_dir = %config.download_dir.display(),
            default_parent_id = ?config.default_parent_id,
            "Mirror service ready"
        );

        Self {
            config: Arc::new(config),
            engine,
            event_bus,
            credentials: None,
        }
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Request for `name` inside the job directory `{download_dir}/{job_id}`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] when `job_id` is not a single path
    /// component, and [`CoreError::Mirror`] when `name` leaves the job
    /// directory.
    pub fn request(
        &self,
        job_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<UploadRequest> {
        let job_id = job_id.into();
        let job_dir = self.config.job_dir(&job_id)?;
        let request = UploadRequest::new(job_id, job_dir, name);
        request.validate()?;
        Ok(request)
    }

    /// Run one upload job.
    ///
    /// `listener` receives the job notifications; the same notifications are
    /// published on the service event bus as [`UploadEvent`](core_runtime::events::UploadEvent)s.
    pub async fn upload(
        &self,
        request: &UploadRequest,
        listener: &dyn UploadListener,
    ) -> Result<UploadOutcome> {
        let events = EventBusListener::new(self.event_bus.clone(), request);
        let listeners = TeeListener::new(listener, &events);
        Ok(self.engine.upload(request, &listeners).await?)
    }

    /// Subscribe to upload and authentication events.
    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Forget cached tokens. A no-op for services built with
    /// [`with_credentials`](Self::with_credentials).
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(credentials) = &self.credentials {
            credentials.sign_out().await?;
        }
        Ok(())
    }
}

/// Build a service on the desktop bridges: `reqwest` HTTP, `tokio::fs` and a
/// token-cache file at `config.token_cache_path`.
#[cfg(feature = "desktop-shims")]
pub fn bootstrap_desktop(
    config: MirrorConfig,
    consent: Arc<dyn ConsentHandler>,
) -> Result<MirrorService> {
    use bridge_desktop::{FileSecureStore, ReqwestHttpClient, TokioFileSystem};

    let http_client = ReqwestHttpClient::new()
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    let deps = CoreDependencies::new(
        Arc::new(http_client),
        Arc::new(TokioFileSystem::new()),
        Arc::new(FileSecureStore::new(config.token_cache_path.clone())),
    );

    MirrorService::new(config, deps, consent)
}
