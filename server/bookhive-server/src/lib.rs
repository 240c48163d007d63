//! Bookhive Server - book catalog and favorites platform API
//!
//! This library provides the core functionality of the Bookhive HTTP server:
//! stateless bearer authentication, refresh session rotation, identity
//! federation with the external sign-in provider, and the RESTful surface
//! around them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod keepalive;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use error::*;
pub use server::BookhiveServer;

use axum::middleware::{from_fn, from_fn_with_state};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use axum::Router;

use crate::middleware::AuthGate;

/// Create the main application router with all routes and middleware
pub fn create_app(server: BookhiveServer) -> Router {
    let gate = AuthGate::new(
        server.codec.clone(),
        [routes::paths::auth::REFRESH.to_string()],
    );

    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer(
                    &server.config.cors_allowed_origins,
                ))
                .layer(from_fn(middleware::request_timing_middleware))
                .layer(from_fn_with_state(gate, middleware::bearer_gate)),
        )
        .with_state(server)
}
