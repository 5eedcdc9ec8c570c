//! Login, dashboard and logout pages.

use axum::{
    extract::Extension,
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, SET_COOKIE},
        HeaderMap, StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tracing::error;

use super::found;
use crate::oauthgate::{session::extract_session_cookie, utils::escape_html, AppState};

const STYLESHEET: &str = r#"
body { font-family: system-ui, sans-serif; background: #f8fafc; color: #0f172a; margin: 0; }
.container { max-width: 28rem; margin: 6rem auto; padding: 0 1rem; }
.card { background: #fff; border-radius: 0.75rem; padding: 2rem; box-shadow: 0 1px 3px rgba(15, 23, 42, 0.12); }
.badge { display: inline-block; font-size: 0.75rem; padding: 0.2rem 0.6rem; border-radius: 999px; }
.badge-info { background: #e0f2fe; color: #0369a1; }
.badge-warning { background: #fef3c7; color: #b45309; }
.badge-danger { background: #fee2e2; color: #b91c1c; }
.btn { display: inline-block; margin-top: 1rem; padding: 0.6rem 1.2rem; border-radius: 0.5rem; background: #1e293b; color: #fff; text-decoration: none; }
.btn-muted { background: #f1f5f9; color: #475569; }
.footer { text-align: center; font-size: 0.8rem; color: #94a3b8; margin-top: 1.5rem; }
"#;

/// Wrap `content` in the shared page layout.
pub(crate) fn render_page(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="/style.css">
</head>
<body>
    <div class="container">
        <div class="card">
            {content}
        </div>
        <div class="footer">{name} {version}</div>
    </div>
</body>
</html>
"#,
        title = escape_html(title),
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    )
}

pub async fn home() -> Html<String> {
    let content = r#"
    <div class="badge badge-info">Sign in</div>
    <h1>Welcome</h1>
    <p>Sign in with your Google account to continue.</p>
    <a href="/auth/google?returnTo=/dashboard" class="btn">Sign in with Google</a>
    "#;
    Html(render_page("Login", content))
}

pub async fn dashboard(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    let identity = match extract_session_cookie(&headers) {
        Some(cookie) => state.sessions().lookup(&cookie).await,
        None => None,
    };
    let Some(identity) = identity else {
        return found("/");
    };

    let content = format!(
        r#"
    <div class="badge badge-warning">Authenticated</div>
    <h1>Dashboard</h1>
    <p>Welcome back, {name}!</p>
    <p>You signed in with {provider}.</p>
    <a href="/logout" class="btn btn-muted">Logout</a>
    "#,
        name = escape_html(&identity.display_name),
        provider = escape_html(&identity.provider),
    );
    (
        [(CACHE_CONTROL, "no-store")],
        Html(render_page("Dashboard", &content)),
    )
        .into_response()
}

/// Clear the session and its cookie, then go back to the login page.
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AppState>>) -> Response {
    if let Some(cookie) = extract_session_cookie(&headers) {
        state.sessions().clear(&cookie).await;
    }

    // Always clear the cookie, even if the session was already gone.
    let mut response = found("/");
    match state.sessions().clear_session_cookie() {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clearing cookie: {err}"),
    }
    response
}

pub async fn stylesheet() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLESHEET,
    )
}
