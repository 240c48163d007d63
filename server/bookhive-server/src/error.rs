use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::auth::identity::BridgeError;
use crate::auth::refresh::SessionError;
use crate::storage::StoreError;

/// Bounded, enumerable error codes surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum AuthCode {
    #[serde(rename = "ACCESS_EXPIRED")]
    AccessExpired,
    #[serde(rename = "ACCESS_INVALID")]
    AccessInvalid,
    #[serde(rename = "ACCESS_INVALID_SUBJECT")]
    AccessInvalidSubject,
    #[serde(rename = "REFRESH_INVALID")]
    RefreshInvalid,
    #[serde(rename = "NO_REFRESH")]
    NoRefresh,
    #[serde(rename = "USER_NOT_FOUND")]
    UserNotFound,
    #[serde(rename = "UNAUTHORIZED")]
    Unauthorized,
}

/// Detail reasons attached to some rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum AuthReason {
    #[serde(rename = "NOT_JWT")]
    NotJwt,
    #[serde(rename = "BAD_SIGNATURE")]
    BadSignature,
    #[serde(rename = "MALFORMED")]
    Malformed,
    #[serde(rename = "SUB_NOT_UUID")]
    SubNotUuid,
}

/// Wire envelope for every rejection: `{"error": CODE, "reason"?: STRING}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthErrorBody {
    pub error: AuthCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<AuthReason>,
}

/// Main API error enum
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("authentication rejected: {code:?}")]
    Auth {
        code: AuthCode,
        reason: Option<AuthReason>,
    },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] database_layer::DatabaseError),

    #[error("internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn auth(code: AuthCode) -> Self {
        Self::Auth { code, reason: None }
    }

    pub fn auth_with_reason(code: AuthCode, reason: AuthReason) -> Self {
        Self::Auth {
            code,
            reason: Some(reason),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth { .. } => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing code for the non-auth variants. Internal detail stays in
    /// the server log; the body never carries messages or type names.
    fn error_label(&self) -> &'static str {
        match self {
            ApiError::Auth { .. } => "UNAUTHORIZED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Database(_) | ApiError::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match self {
            ApiError::Auth { code, reason } => {
                tracing::debug!(code = ?code, reason = ?reason, "request rejected");
                (status, Json(AuthErrorBody { error: code, reason })).into_response()
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, "API error occurred");
                } else {
                    tracing::debug!(error = %other, "request rejected");
                }
                let body = serde_json::json!({ "error": other.error_label() });
                (status, Json(body)).into_response()
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Invalid => ApiError::auth(AuthCode::RefreshInvalid),
            SessionError::Database(e) => ApiError::Database(e),
        }
    }
}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::Database(e) => ApiError::Database(e),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => ApiError::Database(e),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Database(err.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
