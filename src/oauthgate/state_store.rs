//! Single-use OAuth `state` tokens.
//!
//! Each login attempt gets an opaque random token bound, in server memory only,
//! to its sanitized return path. The provider echoes the token back on the
//! callback, where it is redeemed exactly once.
//!
//! Entries older than the configured TTL are treated as absent by [`StateStore::redeem`]
//! and removed by [`StateStore::sweep`], which the server runs on an interval.

use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::{sync::Mutex, task::JoinHandle, time::interval};
use tracing::debug;

use super::utils::generate_token;

/// Opaque value sent to the provider as `state`.
#[derive(Clone, PartialEq, Eq)]
pub struct StateToken(String);

impl StateToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep live tokens out of logs.
impl fmt::Debug for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateToken(..)")
    }
}

struct PendingState {
    destination: String,
    issued_at: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedeemError {
    NotFound,
    Expired,
}

pub struct StateStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, PendingState>>,
}

impl StateStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Mint a token and bind it to `destination`.
    ///
    /// # Errors
    /// Returns an error if the OS random source fails.
    pub async fn issue(&self, destination: String) -> Result<StateToken> {
        let token = generate_token()?;
        let mut entries = self.entries.lock().await;
        entries.insert(
            token.clone(),
            PendingState {
                destination,
                issued_at: Instant::now(),
            },
        );
        Ok(StateToken(token))
    }

    /// Consume `token`, returning its destination.
    ///
    /// The entry is removed under the same lock as the lookup, so of several
    /// concurrent calls with one token at most one gets `Ok`.
    ///
    /// # Errors
    /// `NotFound` for unknown or already redeemed tokens, `Expired` for tokens
    /// older than the TTL (which are removed as well).
    pub async fn redeem(&self, token: &str) -> Result<String, RedeemError> {
        let entry = {
            let mut entries = self.entries.lock().await;
            entries.remove(token)
        };
        match entry {
            Some(entry) if entry.issued_at.elapsed() < self.ttl => Ok(entry.destination),
            Some(_) => Err(RedeemError::Expired),
            None => Err(RedeemError::NotFound),
        }
    }

    /// Drop every entry older than the TTL; returns how many were removed.
    pub async fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.issued_at.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Number of tokens still waiting for a callback.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Spawn a background task that evicts expired state tokens on a fixed cadence.
pub fn spawn_sweeper(store: Arc<StateStore>, every: Duration) -> JoinHandle<()> {
    let every = if every.is_zero() {
        Duration::from_secs(1)
    } else {
        every
    };

    tokio::spawn(async move {
        let mut ticker = interval(every);
        loop {
            ticker.tick().await;
            let evicted = store.sweep().await;
            if evicted > 0 {
                debug!("evicted {evicted} expired state tokens");
            }
        }
    })
}
