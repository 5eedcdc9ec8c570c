//! Google OAuth2 authorization-code client.

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::{
    async_trait, authorization_code, AuthenticatedIdentity, IdentityAssertion, IdentityProvider,
    ProviderError,
};
use crate::oauthgate::state_store::StateToken;
use crate::APP_USER_AGENT;

const AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const SCOPES: &str = "profile email";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
}

impl UserInfo {
    fn into_identity(self) -> AuthenticatedIdentity {
        let display_name = self
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.sub.clone());
        AuthenticatedIdentity {
            provider: "google".to_string(),
            subject: self.sub,
            display_name,
            email: self.email,
        }
    }
}

pub struct GoogleProvider {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: Url,
    authorization_endpoint: Url,
    http: Client,
}

impl GoogleProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(client_id: String, client_secret: SecretString, redirect_uri: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Error creating reqwest client")?;
        let authorization_endpoint =
            Url::parse(AUTHORIZATION_ENDPOINT).context("Invalid Google authorization endpoint")?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri,
            authorization_endpoint,
            http,
        })
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self.http.post(TOKEN_ENDPOINT).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::TokenExchange(status.as_u16()));
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, ProviderError> {
        let response = self
            .http
            .get(USERINFO_ENDPOINT)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::UserInfo(status.as_u16()));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    fn authorization_url(&self, state: &StateToken) -> Url {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("state", state.as_str());
        url
    }

    #[instrument(skip_all, fields(provider = "google"))]
    async fn verify(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<AuthenticatedIdentity, ProviderError> {
        let code = authorization_code(assertion)?;
        let access_token = self.exchange_code(code).await?;
        let user_info = self.fetch_user_info(&access_token).await?;
        debug!("verified google subject {}", user_info.sub);
        Ok(user_info.into_identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauthgate::state_store::StateStore;
    use std::collections::HashMap;

    fn provider() -> Result<GoogleProvider> {
        GoogleProvider::new(
            "client-id".to_string(),
            SecretString::from("client-secret".to_string()),
            Url::parse("http://localhost:3000/auth/google/callback")?,
        )
    }

    #[tokio::test]
    async fn authorization_url_carries_only_the_token() -> Result<()> {
        let store = StateStore::new(Duration::from_secs(60));
        let token = store.issue("/settings".to_string()).await?;
        let url = provider()?.authorization_url(&token);

        assert!(url.as_str().starts_with(AUTHORIZATION_ENDPOINT));
        let query: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(query.get("client_id").map(String::as_str), Some("client-id"));
        assert_eq!(
            query.get("redirect_uri").map(String::as_str),
            Some("http://localhost:3000/auth/google/callback")
        );
        assert_eq!(query.get("response_type").map(String::as_str), Some("code"));
        assert_eq!(query.get("scope").map(String::as_str), Some("profile email"));
        assert_eq!(query.get("state").map(String::as_str), Some(token.as_str()));
        assert!(!url.as_str().contains("settings"));
        assert!(!url.as_str().contains("client-secret"));
        Ok(())
    }

    #[tokio::test]
    async fn verify_rejects_provider_error_without_network() -> Result<()> {
        let assertion = IdentityAssertion {
            code: None,
            error: Some("access_denied".to_string()),
        };
        let result = provider()?.verify(&assertion).await;
        assert!(matches!(result, Err(ProviderError::Denied(_))));
        Ok(())
    }

    #[tokio::test]
    async fn verify_rejects_missing_code_without_network() -> Result<()> {
        let result = provider()?.verify(&IdentityAssertion::default()).await;
        assert!(matches!(result, Err(ProviderError::MissingCode)));
        Ok(())
    }

    #[test]
    fn display_name_falls_back_to_email_then_subject() {
        let named = UserInfo {
            sub: "123".to_string(),
            name: Some("Ada Lovelace".to_string()),
            email: Some("ada@example.com".to_string()),
        };
        assert_eq!(named.into_identity().display_name, "Ada Lovelace");

        let email_only = UserInfo {
            sub: "123".to_string(),
            name: Some(" ".to_string()),
            email: Some("ada@example.com".to_string()),
        };
        assert_eq!(email_only.into_identity().display_name, "ada@example.com");

        let bare = UserInfo {
            sub: "123".to_string(),
            name: None,
            email: None,
        };
        let identity = bare.into_identity();
        assert_eq!(identity.display_name, "123");
        assert_eq!(identity.provider, "google");
    }
}
