//! Login service: state-token bound OAuth2 authorization-code flow.
//!
//! `GET /auth/{provider}` binds the requested return path to a fresh state
//! token and sends the browser to the provider. `GET /auth/{provider}/callback`
//! lets the provider verify the user, then redeems the token exactly once and
//! redirects to the bound path. Unknown, replayed or expired tokens get a 403.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Router,
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod flow;
pub mod handlers;
pub mod identity;
mod openapi;
pub mod redirect;
pub mod session;
pub mod state_store;
mod utils;

pub use openapi::ApiDoc;

use identity::IdentityProvider;
use session::SessionStore;
use state_store::{spawn_sweeper, StateStore};

/// Shared per-process state handed to every handler.
pub struct AppState {
    states: Arc<StateStore>,
    sessions: SessionStore,
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
}

impl AppState {
    #[must_use]
    pub fn new(states: Arc<StateStore>, sessions: SessionStore) -> Self {
        Self {
            states,
            sessions,
            providers: HashMap::new(),
        }
    }

    /// Register a provider under its [`IdentityProvider::name`].
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&Arc<dyn IdentityProvider>> {
        self.providers.get(name)
    }

    #[must_use]
    pub fn states(&self) -> &StateStore {
        &self.states
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    fn shared_states(&self) -> Arc<StateStore> {
        Arc::clone(&self.states)
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::pages::home))
        .route("/dashboard", get(handlers::pages::dashboard))
        .route("/logout", get(handlers::pages::logout))
        .route("/style.css", get(handlers::pages::stylesheet))
        .route("/health", get(handlers::health))
        .route("/auth/:provider", get(handlers::login))
        .route("/auth/:provider/callback", get(handlers::callback))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: Arc<AppState>, sweep_interval: Duration) -> Result<()> {
    let sweeper = spawn_sweeper(state.shared_states(), sweep_interval);

    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    sweeper.abort();

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
