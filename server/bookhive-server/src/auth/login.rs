//! Login completion
//!
//! Once the bridge has resolved a local identity, mint the pair of
//! credentials the client leaves with: one short-lived access token and one
//! refresh secret. From this point authentication is self-contained; the
//! external provider's session is never consulted again.

use uuid::Uuid;

use crate::auth::refresh::RefreshService;
use crate::auth::tokens::AccessTokenCodec;
use crate::error::ApiError;

/// Credentials handed to the client after sign-in or refresh.
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub access: String,
    pub refresh: String,
}

pub async fn complete_login(
    codec: &AccessTokenCodec,
    refresh: &RefreshService,
    user_id: Uuid,
    username: &str,
) -> Result<LoginTokens, ApiError> {
    let access = codec.issue(user_id, username)?;
    let refresh = refresh.issue(user_id).await?;

    Ok(LoginTokens { access, refresh })
}
