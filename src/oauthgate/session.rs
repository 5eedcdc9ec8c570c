//! Server-side sessions for authenticated users.
//!
//! The session cookie carries a random session id and an HMAC-SHA256 tag over
//! it, keyed by the session secret. Identities themselves never leave server
//! memory.

use anyhow::{anyhow, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{identity::AuthenticatedIdentity, utils::generate_token};

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE_NAME: &str = "oauthgate_session";

struct SessionEntry {
    identity: AuthenticatedIdentity,
    created_at: Instant,
}

pub struct SessionStore {
    secret: SecretString,
    ttl: Duration,
    secure_cookie: bool,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(secret: SecretString, ttl: Duration, secure_cookie: bool) -> Self {
        Self {
            secret,
            ttl,
            secure_cookie,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Store `identity` under a fresh session id and return the signed cookie value.
    ///
    /// # Errors
    /// Returns an error if the random source or the MAC fails.
    pub async fn establish(&self, identity: AuthenticatedIdentity) -> Result<String> {
        let session_id = generate_token()?;
        let tag = self.sign(&session_id)?;

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        sessions.insert(
            session_id.clone(),
            SessionEntry {
                identity,
                created_at: Instant::now(),
            },
        );
        Ok(format!("{session_id}.{tag}"))
    }

    /// Resolve a cookie value to its identity, if the tag checks out and the
    /// session has not expired.
    pub async fn lookup(&self, cookie_value: &str) -> Option<AuthenticatedIdentity> {
        let session_id = self.verify(cookie_value)?;
        let mut sessions = self.sessions.lock().await;
        let fresh = sessions
            .get(session_id)
            .map(|entry| entry.created_at.elapsed() < self.ttl)?;
        if fresh {
            sessions.get(session_id).map(|entry| entry.identity.clone())
        } else {
            sessions.remove(session_id);
            None
        }
    }

    /// Forget the session behind `cookie_value`. Unknown or forged values are ignored.
    pub async fn clear(&self, cookie_value: &str) {
        if let Some(session_id) = self.verify(cookie_value) {
            self.sessions.lock().await.remove(session_id);
        }
    }

    /// Build a `HttpOnly` cookie for the signed session value.
    pub fn session_cookie(&self, value: &str) -> Result<HeaderValue, InvalidHeaderValue> {
        let ttl_seconds = self.ttl.as_secs();
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}"
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    pub fn clear_session_cookie(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie =
            format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|err| anyhow!("invalid session secret: {err}"))
    }

    fn sign(&self, session_id: &str) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(session_id.as_bytes());
        Ok(Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes()))
    }

    /// Split a cookie value and check its tag in constant time.
    fn verify<'a>(&self, cookie_value: &'a str) -> Option<&'a str> {
        let (session_id, tag) = cookie_value.split_once('.')?;
        let tag = Base64UrlUnpadded::decode_vec(tag).ok()?;
        let mut mac = self.mac().ok()?;
        mac.update(session_id.as_bytes());
        mac.verify_slice(&tag).ok()?;
        Some(session_id)
    }
}

/// Read the session cookie value from request headers.
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next().map(str::trim);
            let val = parts.next().map(str::trim);
            if let (Some(SESSION_COOKIE_NAME), Some(val)) = (key, val) {
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-session-secret-32-bytes-long!!";

    fn identity() -> AuthenticatedIdentity {
        AuthenticatedIdentity {
            provider: "google".to_string(),
            subject: "1234".to_string(),
            display_name: "Ada Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
        }
    }

    fn store(ttl: Duration) -> SessionStore {
        SessionStore::new(SecretString::from(SECRET.to_string()), ttl, false)
    }

    #[tokio::test]
    async fn establish_then_lookup() -> Result<()> {
        let sessions = store(Duration::from_secs(60));
        let cookie = sessions.establish(identity()).await?;
        assert_eq!(sessions.lookup(&cookie).await, Some(identity()));
        Ok(())
    }

    #[tokio::test]
    async fn tampered_cookie_is_rejected() -> Result<()> {
        let sessions = store(Duration::from_secs(60));
        let cookie = sessions.establish(identity()).await?;
        let (session_id, _) = cookie.split_once('.').unwrap_or_default();

        assert_eq!(sessions.lookup(session_id).await, None);
        assert_eq!(sessions.lookup(&format!("{session_id}.AAAA")).await, None);
        assert_eq!(sessions.lookup("garbage").await, None);
        Ok(())
    }

    #[tokio::test]
    async fn cookie_from_other_secret_is_rejected() -> Result<()> {
        let sessions = store(Duration::from_secs(60));
        let other = SessionStore::new(
            SecretString::from("another-secret-that-is-32-bytes!!".to_string()),
            Duration::from_secs(60),
            false,
        );
        let cookie = other.establish(identity()).await?;
        assert_eq!(sessions.lookup(&cookie).await, None);
        Ok(())
    }

    #[tokio::test]
    async fn expired_session_is_dropped() -> Result<()> {
        let sessions = store(Duration::ZERO);
        let cookie = sessions.establish(identity()).await?;
        assert_eq!(sessions.lookup(&cookie).await, None);
        Ok(())
    }

    #[tokio::test]
    async fn clear_removes_session() -> Result<()> {
        let sessions = store(Duration::from_secs(60));
        let cookie = sessions.establish(identity()).await?;
        sessions.clear(&cookie).await;
        assert_eq!(sessions.lookup(&cookie).await, None);
        Ok(())
    }

    #[test]
    fn session_cookie_attributes() -> Result<()> {
        let cookie = store(Duration::from_secs(60)).session_cookie("abc.def")?;
        assert_eq!(
            cookie.to_str()?,
            "oauthgate_session=abc.def; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );

        let secure = SessionStore::new(
            SecretString::from(SECRET.to_string()),
            Duration::from_secs(60),
            true,
        );
        assert!(secure.session_cookie("abc.def")?.to_str()?.ends_with("; Secure"));
        assert!(secure
            .clear_session_cookie()?
            .to_str()?
            .contains("Max-Age=0"));
        Ok(())
    }

    #[test]
    fn extract_session_cookie_finds_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; oauthgate_session=abc.def; lang=en"),
        );
        assert_eq!(extract_session_cookie(&headers), Some("abc.def".to_string()));
    }

    #[test]
    fn extract_session_cookie_none_when_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_session_cookie(&headers), None);
        headers.insert(COOKIE, HeaderValue::from_static("oauthgate_session="));
        assert_eq!(extract_session_cookie(&headers), None);
    }
}
