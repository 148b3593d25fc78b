use chrono::{DateTime, Duration, TimeZone, Utc};
use core_runtime::logging::redact_if_sensitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds before expiry at which a token is treated as expired.
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 300;

/// OAuth 2.0 token set.
///
/// # Security
///
/// Tokens should be stored securely and never logged. The `Debug`
/// implementation redacts them.
///
/// # Examples
///
/// ```
/// use core_auth::OAuthTokens;
/// use chrono::{Duration, Utc};
///
/// let tokens = OAuthTokens {
///     access_token: "ya29.a0...".to_string(),
///     refresh_token: Some("1//0g...".to_string()),
///     expires_at: Utc::now() + Duration::hours(1),
/// };
///
/// assert!(!tokens.is_expired());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token used to obtain new access tokens. Google only issues
    /// one on the first consent for a client.
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
}

impl OAuthTokens {
    /// Create a new token set expiring `expires_in` seconds from now.
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: i64) -> Self {
        Self::issued_at(access_token, refresh_token, expires_in, Utc::now())
    }

    /// Create a new token set expiring `expires_in` seconds after `issued_at`.
    pub fn issued_at(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: i64,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: issued_at + Duration::seconds(expires_in),
        }
    }

    /// Rebuild a token set from its persisted form (`expires_at` in Unix
    /// seconds). Out-of-range timestamps are treated as already expired.
    pub fn from_parts(access_token: String, refresh_token: Option<String>, expires_at: i64) -> Self {
        let expires_at = Utc
            .timestamp_opt(expires_at, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self {
            access_token,
            refresh_token,
            expires_at,
        }
    }

    /// Expiry as Unix seconds.
    pub fn expires_at_unix(&self) -> i64 {
        self.expires_at.timestamp()
    }

    /// Check if the access token is expired or will expire within five minutes.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Same as [`is_expired`](Self::is_expired) against an explicit clock reading.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.is_expired_with_buffer_at(DEFAULT_EXPIRY_BUFFER_SECS, now)
    }

    /// Check if the access token is expired with a custom buffer
    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        self.is_expired_with_buffer_at(buffer_seconds, Utc::now())
    }

    fn is_expired_with_buffer_at(&self, buffer_seconds: i64, now: DateTime<Utc>) -> bool {
        now >= self.expires_at - Duration::seconds(buffer_seconds)
    }

    /// Get the time remaining until token expiration
    ///
    /// Returns `None` if the token is already expired.
    pub fn time_until_expiry(&self) -> Option<Duration> {
        let now = Utc::now();
        if now >= self.expires_at {
            None
        } else {
            Some(self.expires_at - now)
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field(
                "access_token",
                &redact_if_sensitive("access_token", &self.access_token),
            )
            .field(
                "refresh_token",
                &self
                    .refresh_token
                    .as_deref()
                    .map(|token| redact_if_sensitive("refresh_token", token)),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Authentication state of a credential provider.
///
/// ```text
/// SignedOut -> SigningIn -> SignedIn
///                             ^  |
///                             |  v
///                      TokenRefreshing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthState {
    /// No usable tokens
    #[default]
    SignedOut,
    /// Interactive consent in progress
    SigningIn,
    /// Holding a valid access token
    SignedIn,
    /// Token refresh in progress
    TokenRefreshing,
}

impl AuthState {
    /// Returns `true` for `SignedIn` and `TokenRefreshing`.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn | AuthState::TokenRefreshing)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, AuthState::SigningIn | AuthState::TokenRefreshing)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::SignedOut => write!(f, "Signed Out"),
            AuthState::SigningIn => write!(f, "Signing In..."),
            AuthState::SignedIn => write!(f, "Signed In"),
            AuthState::TokenRefreshing => write!(f, "Refreshing Token..."),
        }
    }
}
