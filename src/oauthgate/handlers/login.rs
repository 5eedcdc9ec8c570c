use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::IntoParams;

use super::{found, not_found};
use crate::oauthgate::{flow, AppState};

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Local path to land on after login, defaults to `/dashboard`.
    #[serde(rename = "returnTo")]
    pub return_to: Option<String>,
}

#[utoipa::path(
    get,
    path = "/auth/{provider}",
    params(
        ("provider" = String, Path, description = "Identity provider name, e.g. google"),
        LoginQuery
    ),
    responses(
        (status = 302, description = "Redirect to the provider's authorization endpoint"),
        (status = 404, description = "Unknown identity provider")
    ),
    tag = "auth"
)]
#[instrument(skip(state))]
pub async fn login(
    Path(provider): Path<String>,
    Query(query): Query<LoginQuery>,
    state: Extension<Arc<AppState>>,
) -> Response {
    let Some(provider) = state.provider(&provider) else {
        return not_found();
    };

    match flow::initiate(state.states(), provider.as_ref(), query.return_to.as_deref()).await {
        Ok(url) => found(url.as_str()),
        Err(err) => {
            error!("Failed to initiate login: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
