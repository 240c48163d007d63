//! Refresh session issuance and rotation
//!
//! Long-lived opaque refresh secrets, stored hash-at-rest and strictly
//! single-use: the rotation that consumes a secret revokes its row and
//! inserts exactly one successor inside the same transaction. Lookup
//! failures, revoked rows, and expired rows are indistinguishable to the
//! caller.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use database_layer::{DatabasePool, TransactionManager};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::models::RefreshSession;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Uniform failure for a secret that is unknown, revoked, or expired.
    #[error("invalid refresh session")]
    Invalid,

    #[error(transparent)]
    Database(#[from] database_layer::DatabaseError),
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.into())
    }
}

/// Outcome of a successful rotation
#[derive(Debug, Clone)]
pub struct RotationResult {
    pub user_id: Uuid,
    pub new_raw_refresh: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RefreshService {
    pool: DatabasePool,
    transactions: TransactionManager,
    ttl_days: i64,
}

impl RefreshService {
    pub fn new(pool: DatabasePool, ttl_days: i64) -> Self {
        Self {
            transactions: TransactionManager::new(pool.clone()),
            pool,
            ttl_days,
        }
    }

    /// Issue a fresh refresh secret for the user. The raw value goes back to
    /// the client; only its digest is persisted.
    pub async fn issue(&self, user_id: Uuid) -> Result<String, SessionError> {
        let raw = random_secret();
        let hash = hash_secret(&raw);
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO refresh_sessions (user_id, token_hash, issued_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, FALSE)
            "#,
        )
        .bind(user_id)
        .bind(&hash)
        .bind(now)
        .bind(now + Duration::days(self.ttl_days))
        .execute(self.pool.pool())
        .await?;

        Ok(raw)
    }

    /// Validate a presented secret, revoke the row backing it, and issue one
    /// successor for the same user, all in one transaction.
    ///
    /// The row lock plus the `revoked = FALSE` re-check on the update make
    /// concurrent rotations of the same secret admit at most one winner; the
    /// loser sees the flipped flag and gets the uniform error. Every early
    /// return rolls the transaction back.
    pub async fn consume_and_rotate(&self, raw: &str) -> Result<RotationResult, SessionError> {
        let hash = hash_secret(raw);
        let mut tx = self.transactions.begin().await?;

        let current = sqlx::query_as::<_, RefreshSession>(
            r#"
            SELECT id, user_id, token_hash, issued_at, expires_at, revoked
            FROM refresh_sessions
            WHERE token_hash = $1
            FOR UPDATE
            "#,
        )
        .bind(&hash)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(SessionError::Invalid)?;

        let now = Utc::now();
        if !current.is_live(now) {
            return Err(SessionError::Invalid);
        }

        let revoked = sqlx::query(
            r#"
            UPDATE refresh_sessions
            SET revoked = TRUE
            WHERE id = $1 AND revoked = FALSE
            "#,
        )
        .bind(current.id)
        .execute(&mut *tx)
        .await?;
        if revoked.rows_affected() != 1 {
            return Err(SessionError::Invalid);
        }

        let new_raw = random_secret();
        let expires_at = now + Duration::days(self.ttl_days);
        sqlx::query(
            r#"
            INSERT INTO refresh_sessions (user_id, token_hash, issued_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, FALSE)
            "#,
        )
        .bind(current.user_id)
        .bind(hash_secret(&new_raw))
        .bind(now)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(RotationResult {
            user_id: current.user_id,
            new_raw_refresh: new_raw,
            expires_at,
        })
    }

    /// Housekeeping sweep: delete rows past expiry. Scheduling this is an
    /// operational concern, not part of the request path.
    pub async fn delete_expired(&self) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM refresh_sessions WHERE expires_at < NOW()")
            .execute(self.pool.pool())
            .await?;

        Ok(result.rows_affected())
    }
}

/// 256-bit random secret, URL-safe unpadded
fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 digest of the raw secret, URL-safe unpadded
fn hash_secret(raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_unique_and_urlsafe() {
        let a = random_secret();
        let b = random_secret();

        assert_ne!(a, b);
        // 32 bytes -> 43 base64url chars, no padding
        assert_eq!(a.len(), 43);
        assert!(!a.contains('='));
        assert!(URL_SAFE_NO_PAD.decode(&a).is_ok());
    }

    #[test]
    fn hash_is_deterministic_and_distinct_from_raw() {
        let raw = random_secret();

        assert_eq!(hash_secret(&raw), hash_secret(&raw));
        assert_ne!(hash_secret(&raw), raw);
        // SHA-256 -> 43 base64url chars
        assert_eq!(hash_secret(&raw).len(), 43);
    }
}
