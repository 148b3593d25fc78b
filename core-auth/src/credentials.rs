//! Credential Providers
//!
//! A [`CredentialProvider`] hands out a valid bearer token before each remote
//! call. [`CachedCredentialProvider`] resolves one in this order:
//!
//! 1. the token already held in memory, or loaded once from the [`TokenStore`]
//! 2. a refresh through [`OAuthFlowManager`] when the cached token is expired
//! 3. interactive consent through a [`ConsentHandler`] when there is nothing
//!    usable to refresh
//!
//! Tokens obtained in steps 2 and 3 are written back to the store.

use crate::error::{AuthError, Result};
use crate::oauth::OAuthFlowManager;
use crate::token_store::TokenStore;
use crate::types::{AuthState, OAuthTokens};
use async_trait::async_trait;
use bridge_traits::time::{Clock, SystemClock};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Account name used when a host only ever signs in once.
pub const DEFAULT_ACCOUNT: &str = "default";

/// Source of bearer tokens for remote calls.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Return an access token that is valid at the time of the call.
    async fn access_token(&self) -> Result<String>;
}

/// What the user hands back after visiting the authorization URL.
#[derive(Clone)]
pub struct ConsentResponse {
    pub code: String,
    /// State echoed by the redirect, when the redirect carries one
    pub state: Option<String>,
}

impl std::fmt::Debug for ConsentResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsentResponse")
            .field("code", &redact_if_sensitive("code", &self.code))
            .field("state", &self.state)
            .finish()
    }
}

/// Interactive step of the authorization flow.
///
/// Implementations show `auth_url` to the user (console prompt, browser,
/// chat message) and return the authorization code they obtain.
#[async_trait]
pub trait ConsentHandler: Send + Sync {
    async fn request_consent(&self, auth_url: &str) -> Result<ConsentResponse>;
}

/// Provider that always returns the same token.
///
/// For hosts that manage tokens elsewhere, and for tests.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

#[derive(Default)]
struct CredentialState {
    tokens: Option<OAuthTokens>,
    loaded: bool,
    auth_state: AuthState,
}

/// Credential provider backed by a token cache, refresh, and consent.
///
/// Concurrent callers are serialized so at most one refresh or consent flow
/// runs at a time.
pub struct CachedCredentialProvider {
    flow: OAuthFlowManager,
    store: TokenStore,
    consent: Arc<dyn ConsentHandler>,
    clock: Arc<dyn Clock>,
    account: String,
    event_bus: Option<EventBus>,
    inner: Mutex<CredentialState>,
}

impl CachedCredentialProvider {
    pub fn new(flow: OAuthFlowManager, store: TokenStore, consent: Arc<dyn ConsentHandler>) -> Self {
        Self {
            flow,
            store,
            consent,
            clock: Arc::new(SystemClock),
            account: DEFAULT_ACCOUNT.to_string(),
            event_bus: None,
            inner: Mutex::new(CredentialState::default()),
        }
    }

    /// Store tokens under a different account name.
    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish [`AuthEvent`]s on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub async fn state(&self) -> AuthState {
        self.inner.lock().await.auth_state
    }

    /// Forget the cached tokens, in memory and in the store.
    #[instrument(skip(self), fields(account = %self.account))]
    pub async fn sign_out(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.store.delete_tokens(&self.account).await?;
        inner.tokens = None;
        inner.loaded = true;
        inner.auth_state = AuthState::SignedOut;
        info!("Signed out");
        Ok(())
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(CoreEvent::Auth(event)).ok();
        }
    }

    async fn load_cached(&self) -> Result<Option<OAuthTokens>> {
        match self.store.retrieve_tokens(&self.account).await {
            Ok(tokens) => Ok(tokens),
            Err(AuthError::TokenCorrupted { reason, .. }) => {
                warn!(reason = %reason, "Discarding corrupted token cache");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn persist(&self, tokens: &OAuthTokens) {
        if let Err(e) = self.store.store_tokens(&self.account, tokens).await {
            warn!(error = %e, "Failed to persist tokens; keeping them in memory only");
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens> {
        self.emit(AuthEvent::TokenRefreshing);
        let tokens = self.flow.refresh_access_token(refresh_token).await?;
        self.persist(&tokens).await;
        self.emit(AuthEvent::TokenRefreshed {
            expires_at: tokens.expires_at_unix(),
        });
        Ok(tokens)
    }

    async fn run_consent(&self) -> Result<OAuthTokens> {
        self.emit(AuthEvent::ConsentRequired);
        let (auth_url, verifier) = self.flow.build_auth_url()?;

        let response = self
            .consent
            .request_consent(&auth_url)
            .await
            .map_err(|e| match e {
                AuthError::ConsentFailed(_) => e,
                other => AuthError::ConsentFailed(other.to_string()),
            })?;

        let tokens = self
            .flow
            .exchange_code(&response.code, response.state.as_deref(), &verifier)
            .await?;
        self.persist(&tokens).await;
        self.emit(AuthEvent::SignedIn);
        Ok(tokens)
    }
}

#[async_trait]
impl CredentialProvider for CachedCredentialProvider {
    #[instrument(skip(self), fields(account = %self.account))]
    async fn access_token(&self) -> Result<String> {
        let mut inner = self.inner.lock().await;

        if !inner.loaded {
            inner.tokens = self.load_cached().await?;
            inner.loaded = true;
        }

        let now = self.clock.now();
        let cached = inner
            .tokens
            .as_ref()
            .map(|t| (t.is_expired_at(now), t.access_token.clone(), t.refresh_token.clone()));

        let refresh_token = match cached {
            Some((false, access_token, _)) => {
                debug!("Using cached access token");
                inner.auth_state = AuthState::SignedIn;
                return Ok(access_token);
            }
            Some((true, _, refresh_token)) => refresh_token,
            None => None,
        };

        if let Some(refresh_token) = refresh_token {
            inner.auth_state = AuthState::TokenRefreshing;
            match self.refresh(&refresh_token).await {
                Ok(tokens) => {
                    let access_token = tokens.access_token.clone();
                    inner.tokens = Some(tokens);
                    inner.auth_state = AuthState::SignedIn;
                    return Ok(access_token);
                }
                Err(e) => {
                    warn!(error = %e, "Token refresh failed, falling back to consent");
                    self.emit(AuthEvent::AuthError {
                        message: e.to_string(),
                    });
                }
            }
        }

        inner.auth_state = AuthState::SigningIn;
        match self.run_consent().await {
            Ok(tokens) => {
                let access_token = tokens.access_token.clone();
                inner.tokens = Some(tokens);
                inner.auth_state = AuthState::SignedIn;
                info!("Signed in through interactive consent");
                Ok(access_token)
            }
            Err(e) => {
                inner.tokens = None;
                inner.auth_state = AuthState::SignedOut;
                self.emit(AuthEvent::AuthError {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::OAuthConfig;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use bridge_traits::storage::SecureStore;
    use bytes::Bytes;
    use chrono::{Duration, Utc};
    use mockall::mock;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    mock! {
        Consent {}

        #[async_trait]
        impl ConsentHandler for Consent {
            async fn request_consent(&self, auth_url: &str) -> Result<ConsentResponse>;
        }
    }

    #[derive(Clone, Default)]
    struct MemorySecureStore {
        storage: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SecureStore for MemorySecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.storage
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.storage.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.storage.lock().await.remove(key);
            Ok(())
        }
    }

    fn token_response(access: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(format!(
                r#"{{"access_token":"{}","refresh_token":"1//r","expires_in":3600}}"#,
                access
            )),
        }
    }

    fn flow(http: MockHttpClient) -> OAuthFlowManager {
        OAuthFlowManager::new(
            OAuthConfig::google(
                "cid",
                Some("secret".to_string()),
                "urn:ietf:wg:oauth:2.0:oob",
                vec!["https://www.googleapis.com/auth/drive.file".to_string()],
            ),
            Arc::new(http),
        )
    }

    async fn seeded_store(tokens: &OAuthTokens) -> (TokenStore, MemorySecureStore) {
        let secure = MemorySecureStore::default();
        let store = TokenStore::new(Arc::new(secure.clone()));
        store.store_tokens(DEFAULT_ACCOUNT, tokens).await.unwrap();
        (store, secure)
    }

    #[tokio::test]
    async fn test_valid_cached_token_skips_refresh_and_consent() {
        let cached = OAuthTokens {
            access_token: "ya29.cached".to_string(),
            refresh_token: Some("1//r".to_string()),
            expires_at: Utc::now() + Duration::hours(1),
        };
        let (store, secure) = seeded_store(&cached).await;

        let mut http = MockHttpClient::new();
        http.expect_execute().times(0);
        let mut consent = MockConsent::new();
        consent.expect_request_consent().times(0);

        let provider = CachedCredentialProvider::new(flow(http), store, Arc::new(consent));

        assert_eq!(provider.access_token().await.unwrap(), "ya29.cached");
        assert_eq!(provider.access_token().await.unwrap(), "ya29.cached");
        assert_eq!(provider.state().await, AuthState::SignedIn);
        // Loaded from the store once, then served from memory
        assert_eq!(secure.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let cached = OAuthTokens {
            access_token: "ya29.stale".to_string(),
            refresh_token: Some("1//r".to_string()),
            expires_at: Utc::now() - Duration::minutes(1),
        };
        let (store, _secure) = seeded_store(&cached).await;

        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(token_response("ya29.fresh")));
        let mut consent = MockConsent::new();
        consent.expect_request_consent().times(0);

        let bus = EventBus::new(8);
        let mut events = bus.subscribe();

        let provider = CachedCredentialProvider::new(flow(http), store.clone(), Arc::new(consent))
            .with_event_bus(bus);

        assert_eq!(provider.access_token().await.unwrap(), "ya29.fresh");

        let persisted = store.retrieve_tokens(DEFAULT_ACCOUNT).await.unwrap().unwrap();
        assert_eq!(persisted.access_token, "ya29.fresh");

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshing)
        );
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::TokenRefreshed { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_consent() {
        let cached = OAuthTokens {
            access_token: "ya29.stale".to_string(),
            refresh_token: Some("1//revoked".to_string()),
            expires_at: Utc::now() - Duration::minutes(1),
        };
        let (store, _secure) = seeded_store(&cached).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_mock = Arc::clone(&calls);
        let mut http = MockHttpClient::new();
        http.expect_execute().times(2).returning(move |_| {
            if calls_in_mock.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(HttpResponse {
                    status: 400,
                    headers: HashMap::new(),
                    body: Bytes::from_static(br#"{"error":"invalid_grant"}"#),
                })
            } else {
                Ok(token_response("ya29.consented"))
            }
        });

        let mut consent = MockConsent::new();
        consent
            .expect_request_consent()
            .withf(|url| url.contains("client_id=cid"))
            .times(1)
            .returning(|_| {
                Ok(ConsentResponse {
                    code: "4/code".to_string(),
                    state: None,
                })
            });

        let provider = CachedCredentialProvider::new(flow(http), store, Arc::new(consent));

        assert_eq!(provider.access_token().await.unwrap(), "ya29.consented");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_cache_runs_consent() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::default()));

        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(token_response("ya29.first")));
        let mut consent = MockConsent::new();
        consent.expect_request_consent().times(1).returning(|_| {
            Ok(ConsentResponse {
                code: "4/code".to_string(),
                state: None,
            })
        });

        let provider =
            CachedCredentialProvider::new(flow(http), store.clone(), Arc::new(consent));

        assert_eq!(provider.access_token().await.unwrap(), "ya29.first");
        assert!(store.has_tokens(DEFAULT_ACCOUNT).await.unwrap());
    }

    #[tokio::test]
    async fn test_consent_failure_is_reported() {
        let store = TokenStore::new(Arc::new(MemorySecureStore::default()));

        let mut http = MockHttpClient::new();
        http.expect_execute().times(0);
        let mut consent = MockConsent::new();
        consent
            .expect_request_consent()
            .times(1)
            .returning(|_| Err(AuthError::Other("user closed the prompt".to_string())));

        let provider = CachedCredentialProvider::new(flow(http), store, Arc::new(consent));

        let result = provider.access_token().await;
        match result {
            Err(AuthError::ConsentFailed(msg)) => assert!(msg.contains("user closed")),
            other => panic!("expected ConsentFailed, got {:?}", other),
        }
        assert_eq!(provider.state().await, AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_sign_out_clears_store() {
        let cached = OAuthTokens::new("ya29.x".to_string(), None, 3600);
        let (store, _secure) = seeded_store(&cached).await;

        let provider = CachedCredentialProvider::new(
            flow(MockHttpClient::new()),
            store.clone(),
            Arc::new(MockConsent::new()),
        );

        provider.sign_out().await.unwrap();
        assert!(!store.has_tokens(DEFAULT_ACCOUNT).await.unwrap());
        assert_eq!(provider.state().await, AuthState::SignedOut);
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticTokenProvider::new("fixed");
        assert_eq!(provider.access_token().await.unwrap(), "fixed");
    }

    #[test]
    fn test_consent_response_debug_hides_code() {
        let response = ConsentResponse {
            code: "4/0AY0e-secret".to_string(),
            state: Some("xyz".to_string()),
        };
        let rendered = format!("{:?}", response);
        assert!(!rendered.contains("4/0AY0e-secret"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("xyz"));
    }
}
