//! Identity provider clients.
//!
//! A provider builds the authorization URL for a login attempt and, on
//! callback, turns the provider's assertion (authorization code or error) into
//! a verified [`AuthenticatedIdentity`]. The login flow only ever talks to the
//! [`IdentityProvider`] trait.

pub mod google;

pub use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::state_store::StateToken;

pub use google::GoogleProvider;

/// Verified profile returned by a provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    pub provider: String,
    pub subject: String,
    pub display_name: String,
    pub email: Option<String>,
}

/// What the provider sent back on the callback, besides `state`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct IdentityAssertion {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider denied the login: {0}")]
    Denied(String),
    #[error("callback is missing the authorization code")]
    MissingCode,
    #[error("token exchange failed with status {0}")]
    TokenExchange(u16),
    #[error("userinfo request failed with status {0}")]
    UserInfo(u16),
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Path segment used in `/auth/{name}`.
    fn name(&self) -> &str;

    /// Authorization endpoint URL carrying `state` as the only caller-bound value.
    fn authorization_url(&self, state: &StateToken) -> Url;

    /// Verify the callback assertion with the provider.
    async fn verify(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<AuthenticatedIdentity, ProviderError>;
}

/// Reject callbacks that carry a provider error or no code.
pub(crate) fn authorization_code(assertion: &IdentityAssertion) -> Result<&str, ProviderError> {
    if let Some(error) = assertion.error.as_deref() {
        return Err(ProviderError::Denied(error.to_string()));
    }
    assertion
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .ok_or(ProviderError::MissingCode)
}
