//! OAuth 2.0 / OIDC relying-party client
//!
//! Authorization-code flow with PKCE against the configured external
//! provider, plus the userinfo fetch that yields the claims the identity
//! bridge consumes. The state parameter is a locally generated UUID so the
//! in-flight (state -> PKCE verifier) pair can be parked in the handoff
//! store and consumed exactly once on callback.

use anyhow::Context;
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, AuthorizationCode, ClientId,
    ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use oauth2::url::Url;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::models::ExternalIdentity;
use crate::config::OAuthProviderConfig;

/// Userinfo claims returned by the provider
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub picture: Option<String>,
    pub name: Option<String>,
}

pub struct OAuthLoginClient {
    client: BasicClient,
    http: reqwest::Client,
    provider: String,
    userinfo_url: String,
    scopes: Vec<String>,
}

impl OAuthLoginClient {
    pub fn new(config: &OAuthProviderConfig, http: reqwest::Client) -> anyhow::Result<Self> {
        let client = BasicClient::new(
            ClientId::new(config.client_id.clone()),
            Some(ClientSecret::new(config.client_secret.clone())),
            AuthUrl::new(config.auth_url.clone()).context("invalid authorization URL")?,
            Some(TokenUrl::new(config.token_url.clone()).context("invalid token URL")?),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.redirect_url.clone()).context("invalid redirect URL")?,
        );

        Ok(Self {
            client,
            http,
            provider: config.provider.clone(),
            userinfo_url: config.userinfo_url.clone(),
            scopes: config.scopes.clone(),
        })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Build the provider authorization URL. Returns the state key under
    /// which the PKCE verifier must be parked until the callback.
    pub fn authorization_request(&self) -> (Url, Uuid, PkceCodeVerifier) {
        let state_id = Uuid::new_v4();
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(|| CsrfToken::new(state_id.to_string()));
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }
        let (url, _state) = request.set_pkce_challenge(pkce_challenge).url();

        (url, state_id, pkce_verifier)
    }

    /// Exchange the authorization code for the provider's access token.
    pub async fn exchange(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> anyhow::Result<String> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .context("authorization code exchange failed")?;

        Ok(token.access_token().secret().clone())
    }

    /// Fetch userinfo claims with the provider access token.
    pub async fn fetch_userinfo(&self, access_token: &str) -> anyhow::Result<UserInfo> {
        let info = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .context("userinfo request failed")?
            .error_for_status()
            .context("userinfo request rejected")?
            .json::<UserInfo>()
            .await
            .context("userinfo response did not parse")?;

        Ok(info)
    }
}

impl UserInfo {
    /// Map provider claims to the bridge's input.
    pub fn into_external_identity(self, provider: &str) -> ExternalIdentity {
        ExternalIdentity {
            provider: provider.to_string(),
            subject: self.sub,
            email: self.email,
            email_verified: self.email_verified,
            picture: self.picture,
        }
    }
}
