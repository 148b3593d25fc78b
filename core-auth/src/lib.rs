//! # Authentication Module
//!
//! OAuth 2.0 credentials for the Drive connector.
//!
//! ## Overview
//!
//! This crate obtains, caches, and refreshes the bearer token the connector
//! attaches to every Drive call. Remote code only sees the
//! [`CredentialProvider`] trait.
//!
//! ## Features
//!
//! - OAuth 2.0 installed-app flow with PKCE
//! - Single-attempt token refresh
//! - Token persistence through a platform [`SecureStore`](bridge_traits::SecureStore)
//! - Pluggable interactive consent ([`ConsentHandler`])
//! - Auth state events on the core event bus

pub mod credentials;
pub mod error;
pub mod oauth;
pub mod token_store;
pub mod types;

pub use credentials::{
    CachedCredentialProvider, ConsentHandler, ConsentResponse, CredentialProvider,
    StaticTokenProvider, DEFAULT_ACCOUNT,
};
pub use error::{AuthError, Result};
pub use oauth::{OAuthConfig, OAuthFlowManager, PkceVerifier};
pub use token_store::TokenStore;
pub use types::{AuthState, OAuthTokens};
