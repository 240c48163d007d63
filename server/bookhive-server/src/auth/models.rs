use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Local account. Created by the identity bridge on first sign-in; only
/// profile-sync fields mutate afterwards, and rows are never deleted here.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub is_active: bool,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Link between an external provider identity and a local account.
/// (provider, provider_user_id) is globally unique.
#[derive(Debug, Clone, FromRow)]
pub struct IdentityLink {
    pub id: i64,
    pub user_id: Uuid,
    pub provider: String,
    pub provider_user_id: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
}

/// Persisted refresh session. Holds the digest of the secret, never the raw
/// value; `revoked` flips exactly once, during the rotation that consumed it.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshSession {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Identity asserted by the external sign-in provider, as handed to the
/// federation bridge.
#[derive(Debug, Clone)]
pub struct ExternalIdentity {
    pub provider: String,
    pub subject: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub picture: Option<String>,
}

/// (user id, username) pair resolved by the bridge and consumed by login
/// completion.
#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub user_id: Uuid,
    pub username: String,
}
