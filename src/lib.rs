//! # Oauthgate
//!
//! `oauthgate` is a small login front door for an OAuth2 identity provider.
//! It runs the authorization-code flow and guards it with single-use `state`
//! tokens.
//!
//! ## State tokens
//!
//! Every login attempt gets a 256-bit random token that is bound, in server
//! memory only, to the sanitized post-login path. The provider receives nothing
//! but the token. On callback the token is redeemed exactly once; missing,
//! forged, replayed and expired tokens are answered with `403 Forbidden`.
//!
//! ## Return paths
//!
//! Only local paths (a single leading `/`) are honored as post-login
//! destinations. Anything else is replaced with `/dashboard`.

pub mod cli;
pub mod oauthgate;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
