//! Authentication endpoints: the OIDC sign-in pair, refresh rotation, and
//! the identity probe the frontend polls after login.

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    response::Redirect,
    Json,
};
use oauth2::PkceCodeVerifier;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::login::complete_login;
use crate::error::{ApiError, ApiResult, AuthCode};
use crate::middleware::OptionalUser;
use crate::server::BookhiveServer;

const BEARER_PREFIX: &str = "Bearer ";

/// Refresh rotation response
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    /// Fresh access token
    pub access: String,
    /// Replacement refresh secret; the presented one is now dead
    pub refresh: String,
}

/// Identity probe response
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthInfoResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl AuthInfoResponse {
    fn anonymous() -> Self {
        Self {
            authenticated: false,
            user_id: None,
            username: None,
            active: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Begin the external sign-in: park the PKCE verifier under the state key and
/// send the browser to the provider.
pub async fn oauth_login(State(server): State<BookhiveServer>) -> ApiResult<Redirect> {
    let (url, state_id, pkce_verifier) = server.oauth.authorization_request();

    server
        .handoff
        .put(state_id, json!({ "pkce_verifier": pkce_verifier.secret() }))
        .await?;

    Ok(Redirect::to(url.as_str()))
}

/// Finish the external sign-in: consume the parked state, exchange the code,
/// bridge the asserted identity, and hand both credentials to the frontend in
/// the URL fragment.
pub async fn oauth_callback(
    State(server): State<BookhiveServer>,
    Query(params): Query<OAuthCallbackParams>,
) -> ApiResult<Redirect> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "provider denied the sign-in");
        return Err(ApiError::bad_request("sign-in was denied"));
    }

    let code = params
        .code
        .ok_or_else(|| ApiError::bad_request("missing authorization code"))?;
    let state_id = params
        .state
        .as_deref()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ApiError::bad_request("missing or invalid state"))?;

    // Single use: a replayed state finds nothing.
    let parked = server
        .handoff
        .remove(state_id)
        .await?
        .ok_or_else(|| ApiError::bad_request("unknown or replayed state"))?;
    let pkce_verifier = parked
        .get("pkce_verifier")
        .and_then(|v| v.as_str())
        .map(|v| PkceCodeVerifier::new(v.to_string()))
        .ok_or_else(|| ApiError::internal("parked login state is missing its verifier"))?;

    let provider_token = server
        .oauth
        .exchange(code, pkce_verifier)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "authorization code exchange failed");
            ApiError::bad_request("authorization code exchange failed")
        })?;
    let userinfo = server
        .oauth
        .fetch_userinfo(&provider_token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "userinfo fetch failed");
            ApiError::bad_request("could not fetch the provider profile")
        })?;

    let identity = userinfo.into_external_identity(server.oauth.provider());
    let resolved = server.identity.resolve(&identity).await?;

    let tokens = complete_login(
        &server.codec,
        &server.refresh,
        resolved.user_id,
        &resolved.username,
    )
    .await?;

    tracing::info!(user_id = %resolved.user_id, "sign-in completed");

    let redirect = format!(
        "{}#access={}&refresh={}",
        server.config.auth.frontend_success_url,
        urlencoding::encode(&tokens.access),
        urlencoding::encode(&tokens.refresh),
    );
    Ok(Redirect::to(&redirect))
}

/// Rotate a refresh secret and mint a fresh access token. The raw secret
/// arrives in the same `Authorization: Bearer` form the access tokens use;
/// this path is on the gate's bypass list.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "authentication",
    responses(
        (status = 200, description = "Rotation succeeded", body = RefreshResponse),
        (status = 401, description = "Secret missing, unknown, revoked, or expired")
    )
)]
pub async fn refresh(
    State(server): State<BookhiveServer>,
    headers: HeaderMap,
) -> ApiResult<Json<RefreshResponse>> {
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::auth(AuthCode::NoRefresh))?;

    let rotation = server.refresh.consume_and_rotate(raw).await?;

    let user = server
        .users
        .find_by_id(rotation.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::auth(AuthCode::UserNotFound))?;

    let access = server.codec.issue(user.id, &user.username)?;

    Ok(Json(RefreshResponse {
        access,
        refresh: rotation.new_raw_refresh,
    }))
}

/// Identity probe: whether the presented token resolved, and to whom.
#[utoipa::path(
    get,
    path = "/auth/info",
    tag = "authentication",
    responses(
        (status = 200, description = "Identity state for this request", body = AuthInfoResponse)
    )
)]
pub async fn auth_info(
    State(server): State<BookhiveServer>,
    OptionalUser(user): OptionalUser,
) -> ApiResult<Json<AuthInfoResponse>> {
    let Some(current) = user else {
        return Ok(Json(AuthInfoResponse::anonymous()));
    };

    match server.users.find_by_id(current.user_id).await? {
        Some(user) => Ok(Json(AuthInfoResponse {
            authenticated: true,
            user_id: Some(user.id),
            username: Some(user.username),
            active: Some(user.is_active),
        })),
        None => Ok(Json(AuthInfoResponse::anonymous())),
    }
}
