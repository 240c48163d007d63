//! Identity federation bridge
//!
//! Reconciles the identity asserted by an external sign-in provider with a
//! local account: find by (provider, subject), sync drifted profile fields,
//! or create the account and its identity link in one transaction. The unique
//! constraint on (provider, provider_user_id) is the sole source of truth for
//! existence; losing a first-login race to a concurrent request is resolved
//! by re-reading, not by failing the request.

use database_layer::{DatabaseError, DatabasePool, TransactionManager};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::models::{ExternalIdentity, IdentityLink, ResolvedIdentity, User};

const MAX_USERNAME_LEN: usize = 128;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for BridgeError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.into())
    }
}

impl BridgeError {
    fn is_unique_violation(&self) -> bool {
        match self {
            BridgeError::Database(DatabaseError::SqlxError(e)) => {
                database_layer::is_unique_violation(e)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityBridge {
    pool: DatabasePool,
    transactions: TransactionManager,
}

impl IdentityBridge {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            transactions: TransactionManager::new(pool.clone()),
            pool,
        }
    }

    /// Resolve the asserted identity to exactly one local (user id, username).
    /// Never issues tokens.
    pub async fn resolve(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<ResolvedIdentity, BridgeError> {
        if let Some(existing) = self.find_and_sync(identity).await? {
            return Ok(existing);
        }

        match self.create(identity).await {
            Ok(created) => Ok(created),
            Err(err) if err.is_unique_violation() => {
                // Concurrent first login won the insert; the constraint is
                // authoritative, so re-read instead of surfacing the error.
                tracing::debug!(
                    provider = %identity.provider,
                    "identity created concurrently, re-reading"
                );
                self.find_and_sync(identity).await?.ok_or_else(|| {
                    BridgeError::Database(DatabaseError::QueryFailed(
                        "identity missing after unique-violation race".to_string(),
                    ))
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn find_and_sync(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<Option<ResolvedIdentity>, BridgeError> {
        let link = sqlx::query_as::<_, IdentityLink>(
            r#"
            SELECT id, user_id, provider, provider_user_id, email, email_verified
            FROM auth_identities
            WHERE provider = $1 AND provider_user_id = $2
            "#,
        )
        .bind(&identity.provider)
        .bind(&identity.subject)
        .fetch_optional(self.pool.pool())
        .await?;

        let Some(link) = link else {
            return Ok(None);
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, is_active, avatar_url, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(link.user_id)
        .fetch_one(self.pool.pool())
        .await?;

        self.sync_profile(&link, &user, identity).await?;

        Ok(Some(ResolvedIdentity {
            user_id: user.id,
            username: user.username,
        }))
    }

    /// Idempotent profile sync: write only the fields whose provider value
    /// differs from what is stored.
    async fn sync_profile(
        &self,
        link: &IdentityLink,
        user: &User,
        identity: &ExternalIdentity,
    ) -> Result<(), BridgeError> {
        let email_changed = identity.email.is_some() && identity.email != link.email;
        let verified_changed =
            identity.email_verified.is_some() && identity.email_verified != link.email_verified;
        let picture = identity.picture.as_deref().map(normalize_picture_url);
        let avatar_changed = picture.is_some() && picture != user.avatar_url;

        if !(email_changed || verified_changed || avatar_changed) {
            return Ok(());
        }

        let mut tx = self.transactions.begin().await?;

        if email_changed || verified_changed {
            let email = if email_changed {
                identity.email.clone()
            } else {
                link.email.clone()
            };
            let verified = if verified_changed {
                identity.email_verified
            } else {
                link.email_verified
            };
            sqlx::query(
                "UPDATE auth_identities SET email = $2, email_verified = $3 WHERE id = $1",
            )
            .bind(link.id)
            .bind(email)
            .bind(verified)
            .execute(&mut *tx)
            .await?;
        }

        if avatar_changed {
            sqlx::query("UPDATE users SET avatar_url = $2, updated_at = NOW() WHERE id = $1")
                .bind(user.id)
                .bind(picture)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// First sign-in: create the user and its identity link atomically.
    async fn create(&self, identity: &ExternalIdentity) -> Result<ResolvedIdentity, BridgeError> {
        let username = derive_username(identity);
        let avatar = identity.picture.as_deref().map(normalize_picture_url);

        let mut tx = self.transactions.begin().await?;

        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (username, is_active, avatar_url) VALUES ($1, TRUE, $2) RETURNING id",
        )
        .bind(&username)
        .bind(avatar)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO auth_identities (user_id, provider, provider_user_id, email, email_verified)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(&identity.provider)
        .bind(&identity.subject)
        .bind(&identity.email)
        .bind(identity.email_verified)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            user_id = %user_id,
            provider = %identity.provider,
            "created local account for first sign-in"
        );

        Ok(ResolvedIdentity { user_id, username })
    }
}

/// Username from the provider's email when present, else a provider-qualified
/// fallback, truncated to the column limit.
fn derive_username(identity: &ExternalIdentity) -> String {
    let base = match &identity.email {
        Some(email) => email.clone(),
        None => format!("{}:{}", identity.provider, identity.subject),
    };
    base.chars().take(MAX_USERNAME_LEN).collect()
}

fn normalize_picture_url(url: &str) -> String {
    // Google serves avatars at s96 by default; ask for a usable size.
    url.replace("=s96-", "=s256-")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(email: Option<&str>) -> ExternalIdentity {
        ExternalIdentity {
            provider: "google".to_string(),
            subject: "abc123".to_string(),
            email: email.map(str::to_string),
            email_verified: Some(true),
            picture: None,
        }
    }

    #[test]
    fn username_prefers_email() {
        assert_eq!(derive_username(&identity(Some("reader@example.com"))), "reader@example.com");
    }

    #[test]
    fn username_falls_back_to_provider_qualified_subject() {
        assert_eq!(derive_username(&identity(None)), "google:abc123");
    }

    #[test]
    fn username_is_truncated_to_column_limit() {
        let long = "x".repeat(300);
        let derived = derive_username(&identity(Some(&long)));
        assert_eq!(derived.chars().count(), MAX_USERNAME_LEN);
    }

    #[test]
    fn picture_url_is_upscaled() {
        assert_eq!(
            normalize_picture_url("https://lh3.example.com/photo=s96-c"),
            "https://lh3.example.com/photo=s256-c"
        );
        assert_eq!(normalize_picture_url("https://cdn.example.com/a.png"), "https://cdn.example.com/a.png");
    }
}
