use axum::{
    extract::{Extension, Path, Query},
    http::{header::SET_COOKIE, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument, warn};
use utoipa::IntoParams;

use super::{found, not_found, pages::render_page};
use crate::oauthgate::{
    flow::{self, FlowError},
    identity::IdentityAssertion,
    AppState,
};

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    /// State token issued when the login started.
    pub state: Option<String>,
    /// Authorization code from the provider.
    pub code: Option<String>,
    /// Error reported by the provider instead of a code.
    pub error: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/{provider}/callback",
    params(
        ("provider" = String, Path, description = "Identity provider name, e.g. google"),
        CallbackQuery
    ),
    responses(
        (status = 302, description = "Redirect to the bound destination, or to the login page when the provider rejected the login"),
        (status = 403, description = "Missing, unknown, replayed or expired state token", content_type = "text/html"),
        (status = 404, description = "Unknown identity provider")
    ),
    tag = "auth"
)]
#[instrument(skip(query, state))]
pub async fn callback(
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
    state: Extension<Arc<AppState>>,
) -> Response {
    let Some(identity_provider) = state.provider(&provider) else {
        return not_found();
    };

    // The provider has to vouch for the user before the state token is touched.
    let assertion = IdentityAssertion {
        code: query.code,
        error: query.error,
    };
    let identity = match identity_provider.verify(&assertion).await {
        Ok(identity) => identity,
        Err(err) => {
            warn!(event = "ProviderAuthFailure", "Provider rejected login: {err}");
            return found("/");
        }
    };

    match flow::complete(
        state.states(),
        state.sessions(),
        query.state.as_deref(),
        identity,
    )
    .await
    {
        Ok(completion) => {
            let mut response = found(&completion.destination);
            match state.sessions().session_cookie(&completion.session_cookie) {
                Ok(cookie) => {
                    response.headers_mut().insert(SET_COOKIE, cookie);
                    response
                }
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            }
        }
        Err(FlowError::SecurityViolation(_)) => forbidden(),
        Err(FlowError::Internal(err)) => {
            error!("Failed to complete login: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn forbidden() -> Response {
    let content = r#"
    <div class="badge badge-danger">403</div>
    <h1>Forbidden</h1>
    <p>Security violation detected. Invalid state token.</p>
    <a href="/" class="btn">Start over</a>
    "#;
    (StatusCode::FORBIDDEN, Html(render_page("Forbidden", content))).into_response()
}
