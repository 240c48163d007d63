use axum::{
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    handlers::{auth, health},
    openapi::ApiDoc,
    server::BookhiveServer,
};

pub mod paths {
    pub mod health {
        pub const HEALTH: &str = "/health";
    }

    pub mod auth {
        pub const LOGIN_GOOGLE: &str = "/auth/login/google";
        pub const CALLBACK_GOOGLE: &str = "/auth/callback/google";
        pub const REFRESH: &str = "/auth/refresh";
        pub const INFO: &str = "/auth/info";
    }
}

/// Create health check routes
pub fn health_routes() -> Router<BookhiveServer> {
    Router::new().route(paths::health::HEALTH, get(health::health_check))
}

/// Create authentication routes
pub fn auth_routes() -> Router<BookhiveServer> {
    Router::new()
        .route(paths::auth::LOGIN_GOOGLE, get(auth::oauth_login))
        .route(paths::auth::CALLBACK_GOOGLE, get(auth::oauth_callback))
        .route(paths::auth::REFRESH, post(auth::refresh))
        .route(paths::auth::INFO, get(auth::auth_info))
}

/// Assemble every route plus the API documentation UI
pub fn create_routes() -> Router<BookhiveServer> {
    Router::new()
        .merge(health_routes())
        .merge(auth_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
