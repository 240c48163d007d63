//! OpenAPI documentation for the Bookhive API

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookhive API",
        description = "Book catalog and favorites platform - authentication surface",
        license(name = "AGPL-3.0-only")
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::refresh,
        crate::handlers::auth::auth_info,
    ),
    components(schemas(
        crate::handlers::health::HealthResponse,
        crate::handlers::auth::RefreshResponse,
        crate::handlers::auth::AuthInfoResponse,
        crate::error::AuthErrorBody,
        crate::error::AuthCode,
        crate::error::AuthReason,
    )),
    tags(
        (name = "health", description = "Liveness and readiness"),
        (name = "authentication", description = "Sign-in, token refresh, identity probe")
    )
)]
pub struct ApiDoc;
