//! Post-login destination sanitizing.
//!
//! The destination requested by the client ends up in a `Location` header, so it
//! must stay on this origin. Anything that is not a plain local path is replaced
//! with [`DEFAULT_RETURN_PATH`].

use tracing::warn;

/// Where users land after login when they did not ask for (or asked for an unsafe) path.
pub const DEFAULT_RETURN_PATH: &str = "/dashboard";

/// Return `candidate` if it is a local path, otherwise the default path.
///
/// Never fails and never performs I/O.
#[must_use]
pub fn sanitize(candidate: &str) -> String {
    if is_local_path(candidate) {
        candidate.to_string()
    } else {
        warn!(
            event = "UnsafeRedirect",
            "unsafe return path replaced with {DEFAULT_RETURN_PATH}"
        );
        DEFAULT_RETURN_PATH.to_string()
    }
}

fn is_local_path(candidate: &str) -> bool {
    // `//host` is scheme-relative; browsers also fold `\` into `/`.
    candidate.starts_with('/')
        && !candidate.starts_with("//")
        && !candidate.contains('\\')
        && !candidate.chars().any(|c| c.is_ascii_control())
}
