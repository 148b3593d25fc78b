//! Secure Token Storage
//!
//! Persists OAuth tokens through a [`SecureStore`], keyed by account name.
//!
//! - Tokens are serialized to JSON before storage
//! - Token values are never logged or placed in error messages
//! - Corrupted entries are deleted on read so the next sign-in starts clean
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{OAuthTokens, TokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let token_store = TokenStore::new(secure_store);
//!
//! let tokens = OAuthTokens::new("access".to_string(), Some("refresh".to_string()), 3600);
//! token_store.store_tokens("default", &tokens).await?;
//!
//! let retrieved = token_store.retrieve_tokens("default").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use bridge_traits::storage::SecureStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure storage for OAuth tokens
#[derive(Clone)]
pub struct TokenStore {
    secure_store: Arc<dyn SecureStore>,
}

/// On-disk shape of a token set.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTokens {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: i64,
}

impl TokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing TokenStore");
        Self { secure_store }
    }

    /// Store OAuth tokens for an account, overwriting any previous set.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the secure store rejects
    /// the write.
    pub async fn store_tokens(&self, account: &str, tokens: &OAuthTokens) -> Result<()> {
        let key = Self::storage_key(account);

        let stored = StoredTokens {
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens.expires_at_unix(),
        };

        let json = serde_json::to_vec(&stored).map_err(|e| {
            warn!(account = %account, error = %e, "Failed to serialize tokens");
            AuthError::SerializationFailed {
                context: "token serialization".to_string(),
                source: e,
            }
        })?;

        self.secure_store
            .set_secret(&key, &json)
            .await
            .map_err(|e| {
                warn!(
                    account = %account,
                    error = %e,
                    "Failed to store tokens in secure storage"
                );
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            account = %account,
            has_refresh_token = stored.refresh_token.is_some(),
            "Tokens stored securely"
        );

        Ok(())
    }

    /// Retrieve OAuth tokens for an account.
    ///
    /// Returns:
    /// - `Ok(Some(tokens))` if tokens exist and are valid
    /// - `Ok(None)` if no tokens exist
    /// - `Err(TokenCorrupted)` if the entry could not be parsed (it is
    ///   deleted before returning)
    /// - `Err(SecureStorageUnavailable)` if the store cannot be read
    pub async fn retrieve_tokens(&self, account: &str) -> Result<Option<OAuthTokens>> {
        let key = Self::storage_key(account);

        let data = self.secure_store.get_secret(&key).await.map_err(|e| {
            warn!(
                account = %account,
                error = %e,
                "Failed to retrieve tokens from secure storage"
            );
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(data) = data else {
            debug!(account = %account, "No tokens found in storage");
            return Ok(None);
        };

        let stored: StoredTokens = match serde_json::from_slice(&data) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(
                    account = %account,
                    error = %e,
                    "Failed to deserialize tokens, they may be corrupted"
                );

                if let Err(delete_err) = self.secure_store.delete_secret(&key).await {
                    warn!(
                        account = %account,
                        error = %delete_err,
                        "Failed to delete corrupted token data"
                    );
                }

                return Err(AuthError::TokenCorrupted {
                    key,
                    reason: e.to_string(),
                });
            }
        };

        let tokens =
            OAuthTokens::from_parts(stored.access_token, stored.refresh_token, stored.expires_at);

        info!(
            account = %account,
            has_refresh_token = tokens.refresh_token.is_some(),
            expires_at = stored.expires_at,
            "Tokens retrieved successfully"
        );

        Ok(Some(tokens))
    }

    /// Delete OAuth tokens for an account. Idempotent.
    pub async fn delete_tokens(&self, account: &str) -> Result<()> {
        let key = Self::storage_key(account);

        self.secure_store.delete_secret(&key).await.map_err(|e| {
            warn!(
                account = %account,
                error = %e,
                "Failed to delete tokens from secure storage"
            );
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        info!(account = %account, "Tokens deleted");

        Ok(())
    }

    /// Check if tokens exist for an account without parsing them.
    pub async fn has_tokens(&self, account: &str) -> Result<bool> {
        let key = Self::storage_key(account);

        self.secure_store.has_secret(&key).await.map_err(|e| {
            warn!(
                account = %account,
                error = %e,
                "Failed to check token existence in secure storage"
            );
            AuthError::SecureStorageUnavailable(e.to_string())
        })
    }

    /// Keys are namespaced as `oauth_tokens:<account>`.
    fn storage_key(account: &str) -> String {
        format!("oauth_tokens:{}", account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory SecureStore for testing
    #[derive(Clone, Default)]
    struct MockSecureStore {
        storage: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    #[async_trait]
    impl SecureStore for MockSecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> bridge_traits::error::Result<()> {
            self.storage
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> bridge_traits::error::Result<Option<Vec<u8>>> {
            Ok(self.storage.lock().await.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> bridge_traits::error::Result<()> {
            self.storage.lock().await.remove(key);
            Ok(())
        }
    }

    fn sample_tokens() -> OAuthTokens {
        OAuthTokens::from_parts(
            "access_123".to_string(),
            Some("refresh_456".to_string()),
            1_900_000_000,
        )
    }

    #[tokio::test]
    async fn test_store_and_retrieve_tokens() {
        let store = TokenStore::new(Arc::new(MockSecureStore::default()));
        let tokens = sample_tokens();

        store.store_tokens("default", &tokens).await.unwrap();
        let retrieved = store.retrieve_tokens("default").await.unwrap().unwrap();

        assert_eq!(retrieved, tokens);
    }

    #[tokio::test]
    async fn test_retrieve_nonexistent_tokens() {
        let store = TokenStore::new(Arc::new(MockSecureStore::default()));
        assert!(store.retrieve_tokens("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_has_tokens() {
        let store = TokenStore::new(Arc::new(MockSecureStore::default()));
        store.store_tokens("default", &sample_tokens()).await.unwrap();
        assert!(store.has_tokens("default").await.unwrap());

        store.delete_tokens("default").await.unwrap();
        assert!(!store.has_tokens("default").await.unwrap());

        // Idempotent
        store.delete_tokens("default").await.unwrap();
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let store = TokenStore::new(Arc::new(MockSecureStore::default()));
        store.store_tokens("a", &sample_tokens()).await.unwrap();

        assert!(store.retrieve_tokens("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupted_tokens_are_deleted() {
        let secure = MockSecureStore::default();
        secure
            .set_secret("oauth_tokens:default", b"not json")
            .await
            .unwrap();

        let store = TokenStore::new(Arc::new(secure.clone()));
        let result = store.retrieve_tokens("default").await;

        assert!(matches!(result, Err(AuthError::TokenCorrupted { .. })));
        assert!(secure
            .get_secret("oauth_tokens:default")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_tokens_without_refresh_token() {
        let store = TokenStore::new(Arc::new(MockSecureStore::default()));
        let tokens = OAuthTokens::from_parts("access".to_string(), None, 1_900_000_000);

        store.store_tokens("default", &tokens).await.unwrap();
        let retrieved = store.retrieve_tokens("default").await.unwrap().unwrap();
        assert_eq!(retrieved.refresh_token, None);
    }

    #[tokio::test]
    async fn test_stored_format_uses_unix_expiry() {
        let secure = MockSecureStore::default();
        let store = TokenStore::new(Arc::new(secure.clone()));
        store.store_tokens("default", &sample_tokens()).await.unwrap();

        let raw = secure
            .get_secret("oauth_tokens:default")
            .await
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["expires_at"], 1_900_000_000);
    }
}
