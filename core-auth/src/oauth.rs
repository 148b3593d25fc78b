//! OAuth 2.0 Authorization Flow Manager with PKCE Support
//!
//! Implements RFC 6749 (OAuth 2.0) and RFC 7636 (PKCE) for the installed-app
//! flow used against Google's authorization server.
//!
//! # Overview
//!
//! The OAuth flow manager handles:
//! - Building authorization URLs with PKCE challenge
//! - Exchanging authorization codes for tokens
//! - Refreshing access tokens (single attempt)
//! - State verification when the redirect returns one
//!
//! Tokens, codes and verifiers are never logged.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, OAuthFlowManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = OAuthConfig::google(
//!     "client-id",
//!     Some("client-secret".to_string()),
//!     "urn:ietf:wg:oauth:2.0:oob",
//!     vec!["https://www.googleapis.com/auth/drive.file".to_string()],
//! );
//!
//! let flow_manager = OAuthFlowManager::new(config, http_client);
//! let (auth_url, pkce_verifier) = flow_manager.build_auth_url()?;
//! // Show auth_url to the user, read back the code...
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use core_runtime::logging::redact_if_sensitive;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Google's authorization endpoint.
pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google's token endpoint.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth 2.0 client configuration.
#[derive(Clone)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,
    /// OAuth client secret (installed apps still send one to Google)
    pub client_secret: Option<String>,
    /// Redirect URI registered for the client
    pub redirect_uri: String,
    /// List of OAuth scopes to request
    pub scopes: Vec<String>,
    /// Authorization endpoint URL
    pub auth_url: String,
    /// Token endpoint URL
    pub token_url: String,
}

impl OAuthConfig {
    /// Configuration against Google's endpoints.
    pub fn google(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            redirect_uri: redirect_uri.into(),
            scopes,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self
                    .client_secret
                    .as_deref()
                    .map(|secret| redact_if_sensitive("client_secret", secret)),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// PKCE (Proof Key for Code Exchange) verifier.
///
/// Holds the code verifier and the CSRF state for one authorization attempt.
/// Only the challenge derived from the verifier is sent to the authorization
/// server.
#[derive(Clone)]
pub struct PkceVerifier {
    verifier: String,
    state: String,
}

impl PkceVerifier {
    /// Generates a 32-byte verifier and a 16-byte state, both URL-safe base64
    /// without padding.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();

        let mut verifier_bytes = [0u8; 32];
        rng.fill(&mut verifier_bytes);
        let verifier = URL_SAFE_NO_PAD.encode(verifier_bytes);

        let mut state_bytes = [0u8; 16];
        rng.fill(&mut state_bytes);
        let state = URL_SAFE_NO_PAD.encode(state_bytes);

        Self { verifier, state }
    }

    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Compute the code challenge from the verifier.
    ///
    /// Uses S256 method: BASE64URL(SHA256(code_verifier))
    pub fn challenge(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

impl Default for PkceVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceVerifier")
            .field(
                "verifier",
                &redact_if_sensitive("code_verifier", &self.verifier),
            )
            .field("state", &self.state)
            .finish()
    }
}

/// OAuth 2.0 flow manager.
pub struct OAuthFlowManager {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
}

impl OAuthFlowManager {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    /// Build the authorization URL with PKCE challenge.
    ///
    /// Returns the URL the user must visit and the verifier to keep until the
    /// code comes back.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authorization URL cannot be parsed.
    #[instrument(skip(self), fields(client_id = %self.config.client_id))]
    pub fn build_auth_url(&self) -> Result<(String, PkceVerifier)> {
        let verifier = PkceVerifier::new();
        let challenge = verifier.challenge();

        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AuthError::Other(format!("Invalid auth URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.config.client_id);
            query.append_pair("redirect_uri", &self.config.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("scope", &self.config.scopes.join(" "));
            query.append_pair("state", verifier.state());
            query.append_pair("code_challenge", &challenge);
            query.append_pair("code_challenge_method", "S256");
            // Request a refresh token
            query.append_pair("access_type", "offline");
        }

        debug!("Built authorization URL");

        Ok((url.to_string(), verifier))
    }

    /// Exchange an authorization code for OAuth tokens.
    ///
    /// `state` is the value returned alongside the code, if the redirect
    /// carried one. Out-of-band redirects only yield the code, so `None`
    /// skips the CSRF comparison.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The returned state doesn't match the verifier's
    /// - The token endpoint rejects the code
    /// - Network errors occur
    #[instrument(skip(self, code, state, verifier))]
    pub async fn exchange_code(
        &self,
        code: &str,
        state: Option<&str>,
        verifier: &PkceVerifier,
    ) -> Result<OAuthTokens> {
        if let Some(state) = state {
            if state != verifier.state() {
                warn!("OAuth state mismatch on authorization callback");
                return Err(AuthError::StateMismatch {
                    expected: verifier.state().to_string(),
                    actual: state.to_string(),
                });
            }
        }

        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code.trim()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("code_verifier", verifier.verifier()),
        ];
        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        debug!("Exchanging authorization code for tokens");

        let response = self.post_token_form(&params).await?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(
                status = status,
                error = %error_body,
                "Token exchange failed while exchanging authorization code"
            );

            return Err(AuthError::InvalidAuthCode(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Other(format!("Failed to parse token response: {}", e)))?;

        info!(
            expires_in = token_response.expires_in,
            has_refresh_token = token_response.refresh_token.is_some(),
            "Exchanged authorization code for tokens"
        );

        Ok(OAuthTokens::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
        ))
    }

    /// Refresh an access token using a refresh token.
    ///
    /// Issues exactly one request. When the response omits a new refresh
    /// token, the old one is carried over.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenRefreshFailed`] if the request fails or the
    /// token endpoint rejects the refresh token.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        debug!("Refreshing access token");

        let response = self
            .post_token_form(&params)
            .await
            .map_err(|e| AuthError::TokenRefreshFailed(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let error_body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(
                status = status,
                error = %error_body,
                "Token refresh rejected"
            );

            return Err(AuthError::TokenRefreshFailed(format!(
                "Token endpoint returned {}: {}",
                status, error_body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::Other(format!("Failed to parse token response: {}", e)))?;

        info!(
            expires_in = token_response.expires_in,
            "Refreshed access token"
        );

        Ok(OAuthTokens::new(
            token_response.access_token,
            token_response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            token_response.expires_in,
        ))
    }

    async fn post_token_form(
        &self,
        params: &[(&str, &str)],
    ) -> Result<bridge_traits::http::HttpResponse> {
        let encoded_body = serde_urlencoded::to_string(params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(encoded_body));

        self.http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))
    }
}

/// JSON response from the token endpoint.
#[derive(Debug, Deserialize, Serialize)]
struct TokenResponse {
    access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}
