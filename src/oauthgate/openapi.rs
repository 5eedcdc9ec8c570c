use utoipa::OpenApi;

use super::handlers::{callback, health, login};

#[derive(OpenApi)]
#[openapi(
    paths(login::login, callback::callback, health::health),
    components(schemas(health::Health)),
    tags(
        (name = "auth", description = "OAuth2 login flow"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
