use crate::cli::{
    actions::{server::Args, Action},
    globals::GlobalArgs,
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .with_context(|| format!("missing required argument: --{name}"))
    };

    let mut globals = GlobalArgs::new(required("client-id")?);
    globals.set_client_secret(SecretString::from(required("client-secret")?));
    globals.set_session_secret(SecretString::from(required("session-secret")?));

    Ok(Action::Server(Args {
        port: matches.get_one::<u16>("port").copied().unwrap_or(3000),
        globals,
        callback_url: required("callback-url")?,
        state_ttl_seconds: matches.get_one::<u64>("state-ttl").copied().unwrap_or(600),
        state_sweep_seconds: matches
            .get_one::<u64>("state-sweep-interval")
            .copied()
            .unwrap_or(60),
        session_ttl_seconds: matches
            .get_one::<u64>("session-ttl")
            .copied()
            .unwrap_or(43200),
    }))
}
