//! Login flow: bind a state token on the way out, redeem it on the way back.

use std::fmt;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use super::{
    identity::{AuthenticatedIdentity, IdentityProvider},
    redirect::{sanitize, DEFAULT_RETURN_PATH},
    session::SessionStore,
    state_store::{RedeemError, StateStore},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Violation {
    MissingState,
    UnknownState,
    ExpiredState,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::MissingState => "missing state token",
            Self::UnknownState => "unknown, forged or replayed state token",
            Self::ExpiredState => "expired state token",
        };
        f.write_str(reason)
    }
}

impl From<RedeemError> for Violation {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::NotFound => Self::UnknownState,
            RedeemError::Expired => Self::ExpiredState,
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("security violation: {0}")]
    SecurityViolation(Violation),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Result of a successful callback.
#[derive(Debug)]
pub struct Completion {
    pub destination: String,
    pub session_cookie: String,
}

/// Start a login: sanitize the return path, bind it to a new state token and
/// build the provider URL. Only the token leaves the server.
///
/// # Errors
/// Returns an error if a token cannot be generated.
pub async fn initiate(
    states: &StateStore,
    provider: &dyn IdentityProvider,
    requested_return_path: Option<&str>,
) -> Result<Url, FlowError> {
    let destination = sanitize(requested_return_path.unwrap_or(DEFAULT_RETURN_PATH));
    let token = states.issue(destination).await?;
    Ok(provider.authorization_url(&token))
}

/// Finish a login whose identity the provider has already verified.
///
/// The state token is redeemed before any session is created; a rejected
/// token never falls back to a default destination.
///
/// # Errors
/// `SecurityViolation` for a missing, unknown, replayed or expired token;
/// `Internal` if the session cannot be established.
pub async fn complete(
    states: &StateStore,
    sessions: &SessionStore,
    returned_state: Option<&str>,
    identity: AuthenticatedIdentity,
) -> Result<Completion, FlowError> {
    let token = returned_state
        .map(str::trim)
        .filter(|state| !state.is_empty())
        .ok_or_else(|| reject(&identity, Violation::MissingState))?;

    let destination = states
        .redeem(token)
        .await
        .map_err(|err| reject(&identity, err.into()))?;

    let provider = identity.provider.clone();
    let session_cookie = sessions.establish(identity).await?;
    info!(provider = %provider, "login completed, redirecting to {destination}");

    Ok(Completion {
        destination,
        session_cookie,
    })
}

fn reject(identity: &AuthenticatedIdentity, violation: Violation) -> FlowError {
    warn!(
        event = "SecurityViolation",
        provider = %identity.provider,
        "state validation failed: {violation}"
    );
    FlowError::SecurityViolation(violation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauthgate::identity::{async_trait, IdentityAssertion, ProviderError};
    use crate::oauthgate::state_store::StateToken;
    use anyhow::Result;
    use secrecy::SecretString;
    use std::time::Duration;

    struct StaticProvider;

    #[async_trait]
    impl IdentityProvider for StaticProvider {
        fn name(&self) -> &str {
            "static"
        }

        fn authorization_url(&self, state: &StateToken) -> Url {
            let mut url = Url::parse("https://idp.test/authorize").expect("valid test url");
            url.query_pairs_mut().append_pair("state", state.as_str());
            url
        }

        async fn verify(
            &self,
            _assertion: &IdentityAssertion,
        ) -> Result<AuthenticatedIdentity, ProviderError> {
            Ok(identity())
        }
    }

    fn identity() -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            provider: "static".to_string(),
            subject: "42".to_string(),
            display_name: "Ada".to_string(),
            email: None,
        }
    }

    fn stores() -> (StateStore, SessionStore) {
        (
            StateStore::new(Duration::from_secs(600)),
            SessionStore::new(
                SecretString::from("flow-test-secret-0123456789abcdef".to_string()),
                Duration::from_secs(600),
                false,
            ),
        )
    }

    fn state_of(url: &Url) -> Option<String> {
        url.query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
    }

    #[tokio::test]
    async fn round_trip_redirects_to_requested_path_once() -> Result<()> {
        let (states, sessions) = stores();
        let url = initiate(&states, &StaticProvider, Some("/settings")).await?;
        let token = state_of(&url).unwrap_or_default();
        assert_ne!(token, "/settings");
        assert!(!url.as_str().contains("settings"));

        let completion = complete(&states, &sessions, Some(&token), identity()).await?;
        assert_eq!(completion.destination, "/settings");
        assert_eq!(
            sessions.lookup(&completion.session_cookie).await,
            Some(identity())
        );

        let replay = complete(&states, &sessions, Some(&token), identity()).await;
        assert!(matches!(
            replay,
            Err(FlowError::SecurityViolation(Violation::UnknownState))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn unsafe_return_path_is_replaced() -> Result<()> {
        let (states, sessions) = stores();
        let url = initiate(&states, &StaticProvider, Some("http://evil.example/phish")).await?;
        let token = state_of(&url).unwrap_or_default();

        let completion = complete(&states, &sessions, Some(&token), identity()).await?;
        assert_eq!(completion.destination, DEFAULT_RETURN_PATH);
        Ok(())
    }

    #[tokio::test]
    async fn missing_return_path_uses_default() -> Result<()> {
        let (states, sessions) = stores();
        let url = initiate(&states, &StaticProvider, None).await?;
        let token = state_of(&url).unwrap_or_default();

        let completion = complete(&states, &sessions, Some(&token), identity()).await?;
        assert_eq!(completion.destination, DEFAULT_RETURN_PATH);
        Ok(())
    }

    #[tokio::test]
    async fn empty_or_forged_state_is_rejected() {
        let (states, sessions) = stores();

        for state in [None, Some(""), Some("   ")] {
            let result = complete(&states, &sessions, state, identity()).await;
            assert!(matches!(
                result,
                Err(FlowError::SecurityViolation(Violation::MissingState))
            ));
        }

        let forged = complete(&states, &sessions, Some("forged-token-1234"), identity()).await;
        assert!(matches!(
            forged,
            Err(FlowError::SecurityViolation(Violation::UnknownState))
        ));
    }

    #[tokio::test]
    async fn expired_state_is_rejected() -> Result<()> {
        let states = StateStore::new(Duration::ZERO);
        let (_, sessions) = stores();
        let url = initiate(&states, &StaticProvider, Some("/settings")).await?;
        let token = state_of(&url).unwrap_or_default();

        let result = complete(&states, &sessions, Some(&token), identity()).await;
        assert!(matches!(
            result,
            Err(FlowError::SecurityViolation(Violation::ExpiredState))
        ));
        Ok(())
    }

    #[test]
    fn violation_messages() {
        assert_eq!(
            FlowError::SecurityViolation(Violation::MissingState).to_string(),
            "security violation: missing state token"
        );
        assert_eq!(
            Violation::from(RedeemError::Expired),
            Violation::ExpiredState
        );
    }
}
