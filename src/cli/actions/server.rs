use crate::{
    cli::globals::GlobalArgs,
    oauthgate::{self, identity::GoogleProvider, session::SessionStore, state_store::StateStore},
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub globals: GlobalArgs,
    pub callback_url: String,
    pub state_ttl_seconds: u64,
    pub state_sweep_seconds: u64,
    pub session_ttl_seconds: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the callback URL is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let callback_url = Url::parse(&args.callback_url)
        .with_context(|| format!("Invalid callback URL: {}", args.callback_url))?;
    // Only mark cookies secure when the service is reached over HTTPS.
    let secure_cookie = callback_url.scheme() == "https";

    let google = GoogleProvider::new(
        args.globals.client_id,
        args.globals.client_secret,
        callback_url,
    )?;

    let states = Arc::new(StateStore::new(Duration::from_secs(args.state_ttl_seconds)));
    let sessions = SessionStore::new(
        args.globals.session_secret,
        Duration::from_secs(args.session_ttl_seconds),
        secure_cookie,
    );
    let state = Arc::new(oauthgate::AppState::new(states, sessions).with_provider(Arc::new(google)));

    oauthgate::new(
        args.port,
        state,
        Duration::from_secs(args.state_sweep_seconds),
    )
    .await
}
